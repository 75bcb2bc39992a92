pub mod engagement;
pub mod notification;
pub mod post;
pub mod social_graph;
pub mod stats;
pub mod user;
pub mod visitor;
