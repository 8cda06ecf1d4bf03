use criterion::{Criterion, black_box, criterion_group, criterion_main};
use html::{NodeId, Selector, parse_document, serialize_document, tokenize};

const SMALL_BLOCKS: usize = 64;
const LARGE_BLOCKS: usize = 20_000;

fn make_blocks(count: usize) -> String {
    let mut out = String::with_capacity(count * 64);
    out.push_str("<!DOCTYPE html><html><head><title>bench</title></head><body>");
    for i in 0..count {
        out.push_str("<div class=box><span>hello</span><p>item ");
        out.push_str(&i.to_string());
        out.push_str("</p><img src=x></div>");
    }
    out.push_str("</body></html>");
    out
}

fn make_rawtext_adversarial(bytes: usize) -> String {
    let mut body = String::with_capacity(bytes + 32);
    body.push_str("<script>");
    while body.len() < bytes {
        body.push_str("</scri<pt");
    }
    body.push_str("</script>");
    body
}

fn bench_tokenize_small(c: &mut Criterion) {
    let input = make_blocks(SMALL_BLOCKS);
    c.bench_function("bench_tokenize_small", |b| {
        b.iter(|| black_box(tokenize(black_box(&input)).len()));
    });
}

fn bench_parse_large(c: &mut Criterion) {
    let input = make_blocks(LARGE_BLOCKS);
    c.bench_function("bench_parse_large", |b| {
        b.iter(|| black_box(parse_document(black_box(&input))));
    });
}

fn bench_serialize_large(c: &mut Criterion) {
    let doc = parse_document(&make_blocks(LARGE_BLOCKS));
    c.bench_function("bench_serialize_large", |b| {
        b.iter(|| black_box(serialize_document(black_box(&doc)).len()));
    });
}

fn bench_nth_path_query_large(c: &mut Criterion) {
    let doc = parse_document(&make_blocks(LARGE_BLOCKS));
    let selector =
        Selector::parse("html > body > div:nth-of-type(19999) > p:nth-of-type(1)").expect("selector");
    c.bench_function("bench_nth_path_query_large", |b| {
        b.iter(|| black_box(selector.query_first(&doc, NodeId::ROOT)));
    });
}

fn bench_tokenize_rawtext_adversarial(c: &mut Criterion) {
    let input = make_rawtext_adversarial(512 * 1024);
    c.bench_function("bench_tokenize_rawtext_adversarial", |b| {
        b.iter(|| black_box(tokenize(black_box(&input)).len()));
    });
}

criterion_group!(
    benches,
    bench_tokenize_small,
    bench_parse_large,
    bench_serialize_large,
    bench_nth_path_query_large,
    bench_tokenize_rawtext_adversarial
);
criterion_main!(benches);
