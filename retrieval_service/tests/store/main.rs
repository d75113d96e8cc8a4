mod qdrant_repository;
