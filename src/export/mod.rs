pub mod codec;
pub mod exporter;
pub mod pipe;

pub use codec::{encode_message, encode_payload, format_scalar, read_message};
pub use exporter::PoseExporter;
pub use pipe::PipeChannel;
