pub mod decoder;
pub mod encoder;

pub use decoder::{decode_query, EdnsInfo, WireQuery};
pub use encoder::{encode_answer_response, encode_negative_response, encode_rcode_response, EncodedResponse, ResponseCode};
