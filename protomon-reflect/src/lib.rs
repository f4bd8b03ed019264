//! Runtime protobuf schemas for protomon.
//!
//! [`DescriptorPool`] resolves `FileDescriptorSet`s into message and enum
//! descriptors, and [`DynamicMessage`] holds an instance of any message type
//! in the pool. [`codec`] moves dynamic messages to and from the binary wire
//! format.

pub mod codec;
pub mod descriptor;
mod error;
pub mod pool;
pub mod value;
pub mod wire;

pub use error::Error;
pub use pool::{
    Cardinality, DescriptorPool, EnumDescriptor, EnumValueDescriptor, FieldDescriptor, Kind,
    MapEntryInfo, MessageDescriptor, OneofDescriptor, Syntax,
};
pub use value::{DynamicMessage, MapKey, MapValue, Value};
