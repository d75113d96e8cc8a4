pub mod document_retrieval;
pub mod visibility_filter;
