//! 路由决策解析：把模型的三行回复解析为 RouteDecision
//!
//! 约定格式（顺序固定，标签可省略）：
//! ```text
//! database: <名称>
//! genes: <g1>,<g2>,...
//! load: <True|False>
//! ```
//! 先去掉全部单双引号，再按行切分；空行不计。不足三行返回 ParseError::MissingLine。
//! 这里不校验 database / load 的取值，交给 Matcher 处理。

use serde::Serialize;

use crate::core::ParseError;

const DATABASE_LABEL: &str = "database:";
const GENES_LABEL: &str = "genes:";
const LOAD_LABEL: &str = "load:";

/// 解析后的路由决策（用完即弃）
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteDecision {
    /// 未经校验的数据库名
    pub database: String,
    pub genes: Vec<String>,
    pub load: String,
}

impl RouteDecision {
    /// 是否需要从文件加载基因列表
    pub fn wants_file(&self) -> bool {
        self.load == "True"
    }
}

pub fn parse_route_decision(response: &str) -> Result<RouteDecision, ParseError> {
    let cleaned: String = response.chars().filter(|c| *c != '\'' && *c != '"').collect();
    let lines: Vec<&str> = cleaned
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    if lines.len() < 3 {
        return Err(ParseError::MissingLine {
            expected: 3,
            found: lines.len(),
        });
    }

    let database = strip_label(lines[0], DATABASE_LABEL).to_string();

    let genes = strip_label(lines[1], GENES_LABEL)
        .split(',')
        .map(str::trim)
        .filter(|g| !g.is_empty())
        .map(String::from)
        .collect();

    let load = strip_label(lines[2], LOAD_LABEL)
        .split(',')
        .next()
        .unwrap_or_default()
        .trim()
        .to_string();

    Ok(RouteDecision {
        database,
        genes,
        load,
    })
}

fn strip_label<'a>(line: &'a str, label: &str) -> &'a str {
    line.strip_prefix(label).unwrap_or(line).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_well_formed() {
        let d = parse_route_decision("database: ENRICHR\ngenes: TP53,BRCA1,EGFR\nload: False\n")
            .unwrap();
        assert_eq!(d.database, "ENRICHR");
        assert_eq!(d.genes, vec!["TP53", "BRCA1", "EGFR"]);
        assert_eq!(d.load, "False");
        assert!(!d.wants_file());
    }

    #[test]
    fn test_parse_strips_quotes() {
        let d = parse_route_decision("database: \"GENEONTOLOGY\"\ngenes: 'MYOD1', 'PAX7'\nload: 'True'")
            .unwrap();
        assert_eq!(d.database, "GENEONTOLOGY");
        assert_eq!(d.genes, vec!["MYOD1", "PAX7"]);
        assert!(d.wants_file());
    }

    #[test]
    fn test_load_takes_text_before_first_comma() {
        let d = parse_route_decision("database: ENRICHR\ngenes: A\nload: True, because a file was named")
            .unwrap();
        assert_eq!(d.load, "True");
    }

    #[test]
    fn test_labels_are_optional() {
        let d = parse_route_decision("Enrichr\nTP53\nFalse").unwrap();
        assert_eq!(d.database, "Enrichr");
        assert_eq!(d.genes, vec!["TP53"]);
        assert_eq!(d.load, "False");
    }

    #[test]
    fn test_label_is_case_sensitive() {
        let d = parse_route_decision("Database: ENRICHR\ngenes: A\nload: False").unwrap();
        assert_eq!(d.database, "Database: ENRICHR");
    }

    #[test]
    fn test_missing_lines_is_an_error() {
        let err = parse_route_decision("database: ENRICHR\ngenes: TP53").unwrap_err();
        assert_eq!(err, ParseError::MissingLine { expected: 3, found: 2 });

        let err = parse_route_decision("").unwrap_err();
        assert_eq!(err, ParseError::MissingLine { expected: 3, found: 0 });
    }

    #[test]
    fn test_reparse_of_rendered_decision_is_stable() {
        let fixtures = [
            "database: ENRICHR\ngenes: TP53,BRCA1\nload: False",
            "database: GO\ngenes: \nload: True",
            "database:  gene ontology \ngenes:  X , Y ,Z\nload: no",
        ];
        for text in fixtures {
            let first = parse_route_decision(text).unwrap();
            let rendered = format!(
                "database: {}\ngenes: {}\nload: {}",
                first.database,
                first.genes.join(","),
                first.load
            );
            assert_eq!(parse_route_decision(&rendered).unwrap(), first, "{text}");
        }
    }
}
