use super::ReadError;
use crate::decode::Decoder;
use crate::source::RawArray;

/// Reads a 1-D array in fixed-size chunks aligned to its storage chunks.
///
/// Every chunk holds `chunk_size` elements except the last, which holds the
/// remainder. A remainder of zero produces no trailing chunk, so an empty
/// array yields nothing. The cursor is consumed as it is read.
pub struct ChunkCursor<'a, T> {
    array: &'a dyn RawArray<T>,
    chunk_size: usize,
    len: usize,
    position: usize,
}

impl<'a, T> ChunkCursor<'a, T> {
    /// Cursor with an explicit chunk size
    pub fn new(array: &'a dyn RawArray<T>, chunk_size: usize) -> Result<Self, ReadError> {
        let shape = array.shape();
        if shape.len() != 1 {
            return Err(ReadError::UnsupportedInput(format!(
                "chunked reading requires a 1-D array, got shape {:?}",
                shape
            )));
        }
        if chunk_size == 0 {
            return Err(ReadError::UnsupportedInput(
                "chunk size must be positive".to_string(),
            ));
        }

        Ok(Self {
            array,
            chunk_size,
            len: shape[0],
            position: 0,
        })
    }

    /// Cursor reading `mult` native storage chunks at a time
    pub fn aligned(array: &'a dyn RawArray<T>, mult: usize) -> Result<Self, ReadError> {
        let chunk_size = array.chunk_len().saturating_mul(mult);
        Self::new(array, chunk_size)
    }

    /// Elements per full chunk
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Number of chunks this cursor produces from its current position
    pub fn remaining_chunks(&self) -> usize {
        (self.len - self.position).div_ceil(self.chunk_size)
    }

    /// Apply `decoder` to every chunk
    pub fn decoded<D>(self, decoder: D) -> DecodedChunks<'a, T, D>
    where
        D: Decoder<Raw = T>,
    {
        DecodedChunks {
            cursor: self,
            decoder,
        }
    }
}

impl<T> Iterator for ChunkCursor<'_, T> {
    type Item = Result<Vec<T>, ReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.position >= self.len {
            return None;
        }
        let end = (self.position + self.chunk_size).min(self.len);
        let chunk = self.array.read(self.position..end);
        self.position = end;
        Some(chunk.map_err(ReadError::from))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.remaining_chunks();
        (remaining, Some(remaining))
    }
}

/// A [`ChunkCursor`] whose chunks pass through a [`Decoder`]
pub struct DecodedChunks<'a, T, D> {
    cursor: ChunkCursor<'a, T>,
    decoder: D,
}

impl<T, D> Iterator for DecodedChunks<'_, T, D>
where
    D: Decoder<Raw = T>,
{
    type Item = Result<Vec<D::Decoded>, ReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        let decoder = &self.decoder;
        self.cursor
            .next()
            .map(|chunk| chunk.map(|raw| decoder.decode(&raw)))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.cursor.size_hint()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::TimeDecoder;
    use crate::source::MemoryArray;
    use proptest::prelude::*;

    fn collect(cursor: ChunkCursor<'_, u32>) -> Vec<Vec<u32>> {
        cursor.map(|chunk| chunk.unwrap()).collect()
    }

    #[test]
    fn test_partial_final_chunk() {
        let array = MemoryArray::new((0..10).collect::<Vec<u32>>(), 4);
        let cursor = ChunkCursor::aligned(&array, 1).unwrap();
        assert_eq!(cursor.remaining_chunks(), 3);

        let chunks = collect(cursor);
        assert_eq!(
            chunks,
            vec![vec![0, 1, 2, 3], vec![4, 5, 6, 7], vec![8, 9]]
        );
    }

    #[test]
    fn test_exact_multiple_has_no_empty_trailing_chunk() {
        let array = MemoryArray::new((0..8).collect::<Vec<u32>>(), 4);
        let chunks = collect(ChunkCursor::aligned(&array, 1).unwrap());
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| c.len() == 4));
    }

    #[test]
    fn test_empty_array_yields_nothing() {
        let array = MemoryArray::new(Vec::<u32>::new(), 4);
        let cursor = ChunkCursor::aligned(&array, 1).unwrap();
        assert_eq!(cursor.remaining_chunks(), 0);
        assert!(collect(cursor).is_empty());
    }

    #[test]
    fn test_multiplier_scales_chunk() {
        let array = MemoryArray::new((0..12).collect::<Vec<u32>>(), 2);
        let cursor = ChunkCursor::aligned(&array, 3).unwrap();
        assert_eq!(cursor.chunk_size(), 6);
        assert_eq!(collect(cursor).len(), 2);
    }

    #[test]
    fn test_rejects_multidimensional_input() {
        let array = MemoryArray::with_shape(vec![0u32; 12], vec![3, 4], 1);
        let result = ChunkCursor::<u32>::aligned(&array, 1);
        assert!(matches!(result, Err(ReadError::UnsupportedInput(_))));
    }

    #[test]
    fn test_rejects_zero_chunk() {
        let array = MemoryArray::new(vec![0u32; 4], 0);
        let result = ChunkCursor::<u32>::aligned(&array, 1);
        assert!(matches!(result, Err(ReadError::UnsupportedInput(_))));
    }

    #[test]
    fn test_decoded_chunks() {
        let array = MemoryArray::new(vec![0u64, 500, 1000, 1500, 2000], 2);
        let chunks: Vec<Vec<f64>> = ChunkCursor::<u64>::aligned(&array, 1)
            .unwrap()
            .decoded(TimeDecoder::new(1000.0))
            .map(|c| c.unwrap())
            .collect();
        assert_eq!(chunks, vec![vec![0.0, 0.5], vec![1.0, 1.5], vec![2.0]]);
    }

    proptest! {
        #[test]
        fn prop_chunks_concatenate_to_source(n in 0usize..600, chunk in 1usize..80) {
            let data: Vec<u32> = (0..n as u32).collect();
            let array = MemoryArray::new(data.clone(), chunk);
            let chunks = collect(ChunkCursor::aligned(&array, 1).unwrap());

            prop_assert_eq!(chunks.len(), n.div_ceil(chunk));
            prop_assert!(chunks.iter().all(|c| !c.is_empty() && c.len() <= chunk));
            prop_assert_eq!(chunks.iter().map(Vec::len).sum::<usize>(), n);
            prop_assert_eq!(chunks.concat(), data);
        }
    }
}
