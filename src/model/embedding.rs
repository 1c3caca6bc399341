/// Helper functions for converting embedding vectors to and from the
/// little-endian `F32_BLOB` layout used by the chunk store
pub trait EmbeddingConversion {
    fn to_binary(&self) -> Vec<u8>;
    fn from_binary(binary: &[u8]) -> Self;
}

impl EmbeddingConversion for Vec<f32> {
    fn to_binary(&self) -> Vec<u8> {
        self.iter().flat_map(|f| f.to_le_bytes()).collect()
    }

    fn from_binary(binary: &[u8]) -> Self {
        let mut vec = Vec::with_capacity(binary.len() / 4);
        for chunk in binary.chunks_exact(4) {
            let mut bytes = [0u8; 4];
            bytes.copy_from_slice(chunk);
            vec.push(f32::from_le_bytes(bytes));
        }
        vec
    }
}
