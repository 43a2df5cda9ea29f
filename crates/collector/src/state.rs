use std::sync::Arc;

use config::Config;

use crate::sink::RawSink;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub sink: Arc<RawSink>,
}

pub fn wire_format(config: &Config) -> wire_codec::Format {
    match config.record_format {
        config::RecordFormat::Thrift => wire_codec::Format::Thrift,
        config::RecordFormat::Avro => wire_codec::Format::Avro,
    }
}
