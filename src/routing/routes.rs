//! 路由与处理器
//!
//! Route 是封闭枚举：新增数据库需要新增变体，RouteHandlers::get 的 match 会强制补齐处理器。
//! 处理器直接修改会话状态（output / process），失败时返回 AgentError::RouteHandler。

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::DatabaseSection;
use crate::core::{AgentError, LogEntry, SessionState};
use crate::routing::matcher::best_match;

/// 可路由的外部数据库
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Route {
    Enrichr,
    GeneOntology,
}

impl Route {
    pub const ALL: [Route; 2] = [Route::Enrichr, Route::GeneOntology];

    pub fn name(self) -> &'static str {
        match self {
            Route::Enrichr => "ENRICHR",
            Route::GeneOntology => "GENEONTOLOGY",
        }
    }

    /// 把模型给出的数据库名归到最相近的路由（总能给出结果）
    pub fn resolve(label: &str) -> Route {
        let names = Self::ALL.map(Route::name);
        Self::ALL[best_match(label, &names).unwrap_or(0)]
    }
}

impl std::fmt::Display for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// 路由处理器：拿到会话与基因列表，执行查询并写回会话
#[async_trait]
pub trait RouteHandler: Send + Sync {
    async fn handle(&self, session: &mut SessionState, genes: &[String]) -> Result<(), AgentError>;
}

/// 每个路由一个处理器
#[derive(Clone)]
pub struct RouteHandlers {
    pub enrichr: Arc<dyn RouteHandler>,
    pub gene_ontology: Arc<dyn RouteHandler>,
}

impl RouteHandlers {
    pub fn new(enrichr: Arc<dyn RouteHandler>, gene_ontology: Arc<dyn RouteHandler>) -> Self {
        Self {
            enrichr,
            gene_ontology,
        }
    }

    /// 使用真实的 Enrichr / Gene Ontology HTTP 处理器
    pub fn from_config(cfg: &DatabaseSection) -> Result<Self, AgentError> {
        Ok(Self::new(
            Arc::new(EnrichrHandler::new(cfg)?),
            Arc::new(GeneOntologyHandler::new(cfg)?),
        ))
    }

    pub fn get(&self, route: Route) -> &dyn RouteHandler {
        match route {
            Route::Enrichr => self.enrichr.as_ref(),
            Route::GeneOntology => self.gene_ontology.as_ref(),
        }
    }
}

/// 带超时的 HTTP 客户端；构建失败直接报错，不退回无超时的默认客户端
fn http_client(route: Route, timeout_secs: u64) -> Result<Client, AgentError> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(concat!("brad/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| AgentError::route(route.name(), format!("failed to build HTTP client: {e}")))
}

/// Enrichr 富集结果中的一项
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichmentTerm {
    pub rank: u64,
    pub term: String,
    pub p_value: f64,
    pub adjusted_p_value: f64,
    pub genes: Vec<String>,
}

/// 结果中保留的富集条目数
const MAX_ENRICHMENT_TERMS: usize = 10;

/// Enrichr：addList 上传基因列表，再按配置的库取富集结果
pub struct EnrichrHandler {
    client: Client,
    base_url: String,
    library: String,
}

impl EnrichrHandler {
    pub fn new(cfg: &DatabaseSection) -> Result<Self, AgentError> {
        Ok(Self {
            client: http_client(Route::Enrichr, cfg.timeout_secs)?,
            base_url: cfg.enrichr_url.trim_end_matches('/').to_string(),
            library: cfg.enrichr_library.clone(),
        })
    }

    async fn add_list(&self, genes: &[String]) -> Result<u64, AgentError> {
        let form = reqwest::multipart::Form::new()
            .text("list", genes.join("\n"))
            .text("description", "brad gene list");
        let body: Value = self
            .client
            .post(format!("{}/addList", self.base_url))
            .multipart(form)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AgentError::route(Route::Enrichr.name(), e.to_string()))?
            .json()
            .await
            .map_err(|e| AgentError::route(Route::Enrichr.name(), e.to_string()))?;
        body.get("userListId")
            .and_then(Value::as_u64)
            .ok_or_else(|| AgentError::route(Route::Enrichr.name(), "addList returned no userListId"))
    }

    async fn enrich(&self, list_id: u64) -> Result<Vec<EnrichmentTerm>, AgentError> {
        let body: Value = self
            .client
            .get(format!("{}/enrich", self.base_url))
            .query(&[
                ("userListId", list_id.to_string()),
                ("backgroundType", self.library.clone()),
            ])
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AgentError::route(Route::Enrichr.name(), e.to_string()))?
            .json()
            .await
            .map_err(|e| AgentError::route(Route::Enrichr.name(), e.to_string()))?;
        Ok(parse_enrichment(&body, &self.library))
    }
}

/// 解析 Enrichr 的 enrich 响应：`{库名: [[rank, term, p, z, combined, [genes], adj_p, ...], ...]}`
pub fn parse_enrichment(body: &Value, library: &str) -> Vec<EnrichmentTerm> {
    let Some(rows) = body.get(library).and_then(Value::as_array) else {
        return Vec::new();
    };
    rows.iter()
        .filter_map(|row| {
            let row = row.as_array()?;
            Some(EnrichmentTerm {
                rank: row.first()?.as_u64()?,
                term: row.get(1)?.as_str()?.to_string(),
                p_value: row.get(2)?.as_f64()?,
                genes: row
                    .get(5)?
                    .as_array()?
                    .iter()
                    .filter_map(|g| g.as_str().map(String::from))
                    .collect(),
                adjusted_p_value: row.get(6)?.as_f64()?,
            })
        })
        .take(MAX_ENRICHMENT_TERMS)
        .collect()
}

#[async_trait]
impl RouteHandler for EnrichrHandler {
    async fn handle(&self, session: &mut SessionState, genes: &[String]) -> Result<(), AgentError> {
        if genes.is_empty() {
            return Err(AgentError::route(Route::Enrichr.name(), "no genes to search"));
        }
        let list_id = self.add_list(genes).await?;
        let terms = self.enrich(list_id).await?;
        tracing::info!(list_id, terms = terms.len(), "Enrichr query finished");

        let lines: Vec<String> = terms
            .iter()
            .map(|t| {
                format!(
                    "{}. {} (p={:.3e}, adj p={:.3e}; {})",
                    t.rank,
                    t.term,
                    t.p_value,
                    t.adjusted_p_value,
                    t.genes.join(", ")
                )
            })
            .collect();
        session.output = Some(if lines.is_empty() {
            format!("Enrichr ({}) found no enriched terms.", self.library)
        } else {
            format!("Enrichr ({}) results:\n{}", self.library, lines.join("\n"))
        });
        session.process.push(LogEntry::Result {
            source: Route::Enrichr.name().to_string(),
            detail: json!({
                "library": self.library,
                "user_list_id": list_id,
                "genes": genes,
                "terms": terms,
            }),
        });
        Ok(())
    }
}

/// Gene Ontology：逐个基因查询功能注释
pub struct GeneOntologyHandler {
    client: Client,
    base_url: String,
}

impl GeneOntologyHandler {
    pub fn new(cfg: &DatabaseSection) -> Result<Self, AgentError> {
        Ok(Self {
            client: http_client(Route::GeneOntology, cfg.timeout_secs)?,
            base_url: cfg.gene_ontology_url.trim_end_matches('/').to_string(),
        })
    }

    async fn functions(&self, gene: &str) -> Result<Vec<(String, String)>, AgentError> {
        let body: Value = self
            .client
            .get(function_url(&self.base_url, gene)?)
            .query(&[("rows", "20")])
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| AgentError::route(Route::GeneOntology.name(), e.to_string()))?
            .json()
            .await
            .map_err(|e| AgentError::route(Route::GeneOntology.name(), e.to_string()))?;
        Ok(parse_go_functions(&body))
    }
}

/// `<base>/bioentity/gene/<gene>/function`；基因名作为单个路径段编码，其中的 `/ ? #` 不会改变路径或查询
pub fn function_url(base_url: &str, gene: &str) -> Result<Url, AgentError> {
    let invalid = |msg: String| AgentError::route(Route::GeneOntology.name(), msg);
    let mut url =
        Url::parse(base_url).map_err(|e| invalid(format!("invalid base url {base_url}: {e}")))?;
    url.path_segments_mut()
        .map_err(|_| invalid(format!("base url {base_url} cannot take a path")))?
        .pop_if_empty()
        .extend(["bioentity", "gene"])
        .push(gene)
        .push("function");
    Ok(url)
}

/// 从 associations[].object 中取 (GO id, label)，去重保序
pub fn parse_go_functions(body: &Value) -> Vec<(String, String)> {
    let mut out: Vec<(String, String)> = Vec::new();
    let assocs = body
        .get("associations")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    for a in assocs {
        let Some(obj) = a.get("object") else { continue };
        let id = obj.get("id").and_then(Value::as_str).unwrap_or_default();
        let label = obj.get("label").and_then(Value::as_str).unwrap_or_default();
        if id.is_empty() || out.iter().any(|(i, _)| i == id) {
            continue;
        }
        out.push((id.to_string(), label.to_string()));
    }
    out
}

#[async_trait]
impl RouteHandler for GeneOntologyHandler {
    async fn handle(&self, session: &mut SessionState, genes: &[String]) -> Result<(), AgentError> {
        if genes.is_empty() {
            return Err(AgentError::route(Route::GeneOntology.name(), "no genes to search"));
        }
        let mut sections = Vec::with_capacity(genes.len());
        let mut detail = serde_json::Map::new();
        for gene in genes {
            let terms = self.functions(gene).await?;
            tracing::debug!(gene = %gene, terms = terms.len(), "GO lookup");
            let listed = if terms.is_empty() {
                "no annotations".to_string()
            } else {
                terms
                    .iter()
                    .map(|(id, label)| format!("{label} ({id})"))
                    .collect::<Vec<_>>()
                    .join("; ")
            };
            sections.push(format!("{gene}: {listed}"));
            detail.insert(gene.clone(), json!(terms));
        }
        session.output = Some(format!("Gene Ontology annotations:\n{}", sections.join("\n")));
        session.process.push(LogEntry::Result {
            source: Route::GeneOntology.name().to_string(),
            detail: Value::Object(detail),
        });
        Ok(())
    }
}
