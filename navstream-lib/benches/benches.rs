use rand::Rng;

use navstream::framing::Frame;
use navstream::nmea::{NmeaParser, SentenceParser};
use navstream::ubx::{NavPosllh, CLASS_NAV, ID_NAV_POSLLH};
use navstream::{DecoderOpts, StreamDecoder};
use criterion::{criterion_group, criterion_main, Criterion, Throughput};

const GGA: &str = "$GPGGA,092653.00,4723.86451,N,00833.42750,E,1,14,0.9,450.0,M,47.5,M,,*6C";

fn mixed_stream(count: usize) -> Vec<u8> {
    let llh = NavPosllh {
        itow: 0,
        lon: 85_571_250,
        lat: 473_977_418,
        height: 450_000,
        h_msl: 0,
        h_acc: 0,
        v_acc: 0,
    };
    let frame = Frame::encode(CLASS_NAV, ID_NAV_POSLLH, &llh.encode());
    let mut dat = Vec::new();
    for _ in 0..count {
        dat.extend(format!("{GGA}\r\n").as_bytes());
        dat.extend(&frame);
    }
    dat
}

fn bench_push(c: &mut Criterion) {
    let dat = mixed_stream(256);
    let mut group = c.benchmark_group("push");
    group.throughput(Throughput::Bytes(dat.len() as u64));
    group.bench_function("mixed_64", |b| {
        b.iter(|| {
            let mut decoder = StreamDecoder::new(DecoderOpts::default());
            let mut count = 0;
            for chunk in dat.chunks(64) {
                count += decoder.push(chunk).len();
            }
            assert!(count > 0);
        });
    });
    group.finish();
}

// Random bytes exercise the sync search, resync and line discard paths.
fn bench_resync(c: &mut Criterion) {
    let mut rng = rand::thread_rng();
    let mut buf = vec![0u8; 16 * 1024];
    for b in buf.iter_mut() {
        *b = rng.gen();
    }

    let mut group = c.benchmark_group("resync");
    group.throughput(Throughput::Bytes(buf.len() as u64));
    group.bench_function("random", |b| {
        b.iter(|| {
            let mut decoder = StreamDecoder::new(DecoderOpts::default());
            for chunk in buf.chunks(1024) {
                let _ = decoder.push(chunk);
            }
        });
    });
    group.finish();
}

fn bench_parse_sentence(c: &mut Criterion) {
    let mut group = c.benchmark_group("nmea");
    group.throughput(Throughput::Bytes(GGA.len() as u64));
    group.bench_function("gga", |b| {
        b.iter(|| NmeaParser.parse(GGA).unwrap());
    });
    group.finish();
}

criterion_group!(benches, bench_push, bench_resync, bench_parse_sentence);
criterion_main!(benches);
