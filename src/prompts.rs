//! Prompt 模板
//!
//! 优先读取 config/prompts/<name>.txt（或 ../config/prompts/），找不到时使用内置模板。

const GENE_DATABASE_CALLER: &str = "\
You are BRAD, a bioinformatics assistant. Decide which gene database answers the user's request \
and which genes to search for.

Available databases:
- ENRICHR: gene set enrichment analysis (pathways, cell types, diseases) for a list of genes.
- GENEONTOLOGY: Gene Ontology annotations (biological process, molecular function, cellular component) of individual genes.

Tables currently loaded:
{tables}
If the genes should come from a file or a loaded table rather than the request text, answer load: True.

Respond with exactly three lines and nothing else:
database: <ENRICHR or GENEONTOLOGY>
genes: <comma separated gene symbols, or None>
load: <True or False>";

const PLANNER: &str = "\
You are BRAD, a bioinformatics assistant that plans multi-step research workflows.
Break the user's request into a short sequence of steps. Each step uses exactly one module:
- RAG: answer questions from the local literature database.
- SCRAPE: search online literature.
- DATABASE: query gene databases (Enrichr, Gene Ontology).
- CODE: run analysis code.
- WRITE: write a summary or report.

Format every step as:
**Step <n>**
Module: <MODULE>
Prompt: <the instruction for that module on a single line>
";

const RAG_QA: &str = "\
Use the following documents to answer the question. If the documents do not contain the answer, \
say that you don't know.

{documents}";

fn load_prompt(name: &str, default: &str) -> String {
    [
        format!("config/prompts/{name}.txt"),
        format!("../config/prompts/{name}.txt"),
    ]
    .into_iter()
    .find_map(|p| std::fs::read_to_string(p).ok())
    .unwrap_or_else(|| default.to_string())
}

/// 数据库选择模板，{tables} 替换为已加载表的列名摘要
pub fn gene_database_caller(tables: &str) -> String {
    let tables = if tables.trim().is_empty() { "(none)\n" } else { tables };
    load_prompt("gene_database_caller", GENE_DATABASE_CALLER).replace("{tables}", tables)
}

pub fn planner() -> String {
    load_prompt("planner", PLANNER)
}

/// RAG 问答模板，{documents} 替换为检索到的文档
pub fn rag_qa(documents: &str) -> String {
    load_prompt("rag_qa", RAG_QA).replace("{documents}", documents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gene_database_caller_injects_tables() {
        let t = gene_database_caller("degs.columns = [gene, logFC]\n");
        assert!(t.contains("degs.columns = [gene, logFC]"));
        assert!(!t.contains("{tables}"));
    }

    #[test]
    fn test_gene_database_caller_without_tables() {
        assert!(gene_database_caller("").contains("(none)"));
    }
}
