//! 数据库路由：模型回复解析、相似度匹配、路由处理器、文件加载与 Dispatcher

pub mod dispatcher;
pub mod loader;
pub mod matcher;
pub mod parser;
pub mod routes;

pub use dispatcher::{truncate_terms, Dispatcher, SELECT_DATABASE};
pub use loader::{GeneListLoader, TableGeneLoader};
pub use matcher::{best_match, word_similarity};
pub use parser::{parse_route_decision, RouteDecision};
pub use routes::{EnrichrHandler, GeneOntologyHandler, Route, RouteHandler, RouteHandlers};
