pub mod document_point_store;
