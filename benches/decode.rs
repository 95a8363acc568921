use criterion::{black_box, criterion_group, criterion_main, Criterion};
use botdeck::protocol::decode_image_response;
use botdeck::stream::frame::interpret_line;
use botdeck::stream::lines::LineDecoder;
use botdeck::stream::DeltaDecoder;

fn sample_body(frames: usize) -> Vec<u8> {
    let mut body = String::with_capacity(frames * 64);
    body.push_str(": keep-alive\r\n\r\n");
    for idx in 0..frames {
        body.push_str(&format!(
            "data: {{\"choices\":[{{\"delta\":{{\"content\":\"token {idx} \"}}}}]}}\r\n\r\n"
        ));
    }
    body.push_str("data: [DONE]\r\n");
    body.into_bytes()
}

fn chunked(body: &[u8], size: usize) -> Vec<&[u8]> {
    body.chunks(size).collect()
}

fn bench_delta_decoder(c: &mut Criterion) {
    let body = sample_body(512);

    c.bench_function("delta_decode_512_frames_whole", |b| {
        b.iter(|| {
            let mut decoder = DeltaDecoder::new(16);
            let mut out = Vec::with_capacity(520);
            decoder.feed_into(black_box(&body), &mut out);
            decoder.finish_into(&mut out);
            black_box(out.len())
        });
    });

    let small_chunks = chunked(&body, 17);
    c.bench_function("delta_decode_512_frames_17b_chunks", |b| {
        b.iter(|| {
            let mut decoder = DeltaDecoder::new(16);
            let mut out = Vec::with_capacity(520);
            for chunk in &small_chunks {
                decoder.feed_into(black_box(chunk), &mut out);
            }
            decoder.finish_into(&mut out);
            black_box(out.len())
        });
    });
}

fn bench_line_split(c: &mut Criterion) {
    let body = sample_body(512);
    let chunks = chunked(&body, 256);

    c.bench_function("line_split_512_frames_256b_chunks", |b| {
        b.iter(|| {
            let mut decoder = LineDecoder::new();
            let mut lines = 0usize;
            for chunk in &chunks {
                decoder.push_chunk(black_box(chunk));
                while let Some(line) = decoder.next_line() {
                    lines += line.len();
                }
            }
            black_box(lines)
        });
    });

    let line = "data: {\"choices\":[{\"delta\":{\"content\":\"Hello there\"}}]}";
    c.bench_function("interpret_delta_line", |b| {
        b.iter(|| black_box(interpret_line(black_box(line))));
    });
}

fn bench_image_reply(c: &mut Criterion) {
    let body = br#"{"choices":[{"message":{"content":"Here you go","images":[{"image_url":{"url":"data:image/png;base64,iVBORw0KGgo"}}]}}]}"#;
    c.bench_function("image_reply_decode", |b| {
        b.iter(|| black_box(decode_image_response(black_box(body))));
    });
}

criterion_group!(
    benches,
    bench_delta_decoder,
    bench_line_split,
    bench_image_reply
);
criterion_main!(benches);
