pub mod collaborator_client;
pub mod source_reader;
