pub mod document_point_gateway_repository;
pub mod document_point_qdrant_repository;
