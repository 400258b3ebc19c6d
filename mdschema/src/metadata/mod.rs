mod parser;
mod types;

pub use parser::{discover_metadata_files, parse_metadata, parse_metadata_str};
pub use types::{
    FieldDescriptor, FieldList, ForeignKeyDescriptor, ForeignKeyReference, MetadataDocument,
    ResourceDescriptor, TableSchemaDescriptor,
};
