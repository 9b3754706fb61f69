use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use std::sync::Arc;

use ferrous_gap::gap_opt::{GapOpt, ScorerKind};
use ferrous_gap::output::{CollectingSink, Frame, GappedOutput, PositionOutput};
use ferrous_gap::region::{PlainRegion, ScoredRegion};
use ferrous_gap::scoring::create_scorer;

/// (query_pos, seq_id, build_pos) hits for one query: runs of collinear
/// words with occasional indels, plus scattered noise hits.
fn generate_hits(query_length: i64, num_seqs: u32, seed: u64) -> Vec<(i64, u32, i64)> {
    let mut rng = seed;
    let mut next = move || {
        rng = rng.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        rng >> 33
    };

    let mut hits = Vec::new();
    let mut diagonal = 5_000i64;
    for q in (0..query_length - 16).step_by(3) {
        if next() % 10 == 0 {
            diagonal += (next() % 3) as i64 - 1;
        }
        hits.push((q, 0, q + diagonal));
        if next() % 4 == 0 {
            let seq = (next() % num_seqs as u64) as u32;
            hits.push((q, seq, (next() % 90_000) as i64));
        }
    }
    hits
}

fn replay<O: PositionOutput + ?Sized>(out: &mut O, hits: &[(i64, u32, i64)], query_length: u32) {
    out.next_sequence(0, query_length).unwrap();
    out.next_query(Frame::Forward, query_length).unwrap();
    let mut i = 0;
    while i < hits.len() {
        let pos = hits[i].0;
        out.set_position(pos).unwrap();
        while i < hits.len() && hits[i].0 == pos {
            out.hit(hits[i].1, hits[i].2).unwrap();
            i += 1;
        }
        out.end_position().unwrap();
    }
    out.end_query().unwrap();
    out.end_query_sequence().unwrap();
}

fn bench_merge(c: &mut Criterion) {
    let build_lengths: Arc<[u32]> = Arc::from(vec![100_000u32; 8]);
    let query_length = 2_000u32;
    let hits = generate_hits(query_length as i64, 8, 42);

    let mut group = c.benchmark_group("gapped_output");
    group.throughput(Throughput::Elements(hits.len() as u64));

    for kind in [ScorerKind::WordSize, ScorerKind::Table, ScorerKind::Protein] {
        let opt = GapOpt {
            word_size: 12,
            max_gap: 10,
            max_indel: 3,
            scorer: kind,
            ..GapOpt::default()
        };
        let scorer = create_scorer(&opt.scorer_params()).unwrap();

        group.bench_with_input(BenchmarkId::new("plain", kind.name()), &hits, |b, hits| {
            b.iter(|| {
                let mut out: GappedOutput<PlainRegion, CollectingSink> = GappedOutput::new(
                    opt.merge_params(),
                    Arc::clone(&scorer),
                    Arc::clone(&build_lengths),
                    CollectingSink::new(),
                );
                replay(&mut out, black_box(hits), query_length);
                black_box(out.stats())
            })
        });

        let scored = GapOpt {
            score_threshold: Some(50.0),
            ..opt.clone()
        };
        group.bench_with_input(BenchmarkId::new("scored", kind.name()), &hits, |b, hits| {
            b.iter(|| {
                let mut out: GappedOutput<ScoredRegion, CollectingSink> = GappedOutput::new(
                    scored.merge_params(),
                    Arc::clone(&scorer),
                    Arc::clone(&build_lengths),
                    CollectingSink::new(),
                );
                replay(&mut out, black_box(hits), query_length);
                black_box(out.stats())
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_merge);
criterion_main!(benches);
