//! Injected collaborators the Partition Request Queue depends on, rather
//! than reaching for process-wide singletons.

/// Compresses/decompresses `Data`-typed payloads before they cross the
/// wire. Events always bypass this collaborator : only
/// buffered records are eligible for compression.
pub trait BufferCompressor: Send + Sync {
    fn compress(&self, payload: &[u8]) -> Vec<u8>;
    fn decompress(&self, payload: &[u8]) -> Vec<u8>;
}

/// The identity compressor: a legal `BufferCompressor` that never
/// shrinks anything, used as the default when no real codec is wired in.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopCompressor;

impl BufferCompressor for NoopCompressor {
    fn compress(&self, payload: &[u8]) -> Vec<u8> {
        payload.to_vec()
    }

    fn decompress(&self, payload: &[u8]) -> Vec<u8> {
        payload.to_vec()
    }
}
