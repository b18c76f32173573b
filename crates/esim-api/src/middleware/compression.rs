//! Response compression layer.

use tower_http::compression::CompressionLayer;

/// Builds a gzip compression layer; save dumps compress well.
pub fn build_compression_layer() -> CompressionLayer {
    CompressionLayer::new().gzip(true)
}
