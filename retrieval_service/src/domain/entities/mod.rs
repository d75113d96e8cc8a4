pub mod document_point;
pub mod retrieved_context;
pub mod search_query;
pub mod tenant_id;
