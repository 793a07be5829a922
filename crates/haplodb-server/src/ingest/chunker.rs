//! Batch sizing for bulk inserts.
//!
//! PostgreSQL caps a single statement at 32,767 bind parameters. Multi-row
//! inserts consume `params_per_row` parameters per row, so large payloads
//! must be split into sub-batches before they reach the driver. This module
//! owns the margin policy; the per-format storage layers call [`chunks`] and
//! insert one sub-slice at a time.

/// Hard bind-parameter ceiling for one PostgreSQL statement.
pub const BIND_PARAM_LIMIT: usize = 32_767;

/// Effective ceiling used for sizing. The margin keeps a batch legal even
/// when a statement carries a few parameters beyond the row values.
pub const SAFE_BIND_PARAMS: usize = 32_000;

/// Maximum rows per insert for a row shape consuming `params_per_row` bind
/// parameters. At 6 params/row this is 5,333 rows; at 4 params/row, 8,000.
pub fn rows_per_chunk(params_per_row: usize) -> usize {
    SAFE_BIND_PARAMS / params_per_row.max(1)
}

/// Split `rows` into sub-slices that each stay under the parameter ceiling.
pub fn chunks<T>(rows: &[T], params_per_row: usize) -> std::slice::Chunks<'_, T> {
    rows.chunks(rows_per_chunk(params_per_row))
}

/// Number of sub-batches [`chunks`] will yield for `len` rows.
pub fn chunk_count(len: usize, params_per_row: usize) -> usize {
    len.div_ceil(rows_per_chunk(params_per_row))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_per_chunk_documented_sizes() {
        assert_eq!(rows_per_chunk(6), 5_333);
        assert_eq!(rows_per_chunk(4), 8_000);
        assert_eq!(rows_per_chunk(2), 16_000);
    }

    #[test]
    fn test_rows_per_chunk_never_divides_by_zero() {
        assert_eq!(rows_per_chunk(0), SAFE_BIND_PARAMS);
        assert_eq!(rows_per_chunk(1), SAFE_BIND_PARAMS);
    }

    #[test]
    fn test_every_chunk_stays_under_the_ceiling() {
        let rows: Vec<u32> = (0..20_000).collect();
        for params_per_row in [2, 4, 5, 6] {
            for chunk in chunks(&rows, params_per_row) {
                assert!(chunk.len() * params_per_row <= BIND_PARAM_LIMIT);
            }
        }
    }

    #[test]
    fn test_chunks_concatenate_back_to_input() {
        let rows: Vec<u32> = (0..13_000).collect();
        let rejoined: Vec<u32> = chunks(&rows, 6).flatten().copied().collect();
        assert_eq!(rejoined, rows);
    }

    #[test]
    fn test_chunk_count_matches_ceiling_division() {
        // M rows at P params/row split into ceil(M / floor(C/P)) chunks
        for (len, params) in [(0usize, 6usize), (1, 6), (5_333, 6), (5_334, 6), (20_000, 4)] {
            let expected = len.div_ceil(SAFE_BIND_PARAMS / params);
            assert_eq!(chunk_count(len, params), expected);
            let rows: Vec<usize> = (0..len).collect();
            assert_eq!(chunks(&rows, params).count(), expected);
        }
    }

    #[test]
    fn test_small_batch_is_a_single_chunk() {
        let rows: Vec<u32> = (0..100).collect();
        let collected: Vec<&[u32]> = chunks(&rows, 6).collect();
        assert_eq!(collected.len(), 1);
        assert_eq!(collected[0].len(), 100);
    }
}
