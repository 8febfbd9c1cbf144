use std::path::PathBuf;

use navstream::StreamDecoder;
use rand::Rng;

pub fn fixture_path(name: &str) -> PathBuf {
    let mut path =
        PathBuf::from(std::env::var("CARGO_MANIFEST_DIR").expect("CARGO_MANIFEST_DIR not set"));
    path.push("tests/fixtures");
    path.push(name);
    path
}

/// Split `dat` at random boundaries, never producing empty chunks.
pub fn random_chunks(dat: &[u8], max: usize) -> Vec<&[u8]> {
    let mut rng = rand::thread_rng();
    let mut chunks = Vec::new();
    let mut rest = dat;
    while !rest.is_empty() {
        let n = rng.gen_range(1..=max.min(rest.len()));
        let (chunk, tail) = rest.split_at(n);
        chunks.push(chunk);
        rest = tail;
    }
    chunks
}

/// Push each chunk and render every result, in order, for comparison.
pub fn decode_chunks(decoder: &mut StreamDecoder, chunks: &[&[u8]]) -> Vec<String> {
    chunks
        .iter()
        .flat_map(|chunk| decoder.push(chunk))
        .map(|zult| match zult {
            Ok(unit) => format!("{unit:?}"),
            Err(err) => format!("error: {err}"),
        })
        .collect()
}
