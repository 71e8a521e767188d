extern crate criterion;

use criterion::{criterion_group, criterion_main, Criterion};

use clipweave_lib::{convert_simple, ConvertRequest, EmptyRegistry};

fn bench_large_document(c: &mut Criterion) {
    let mut big_html = String::with_capacity(1_000_000);
    big_html.push_str("<div class=\"page\">");
    for i in 0..10_000 {
        big_html.push_str(&format!("<p class=\"row-{}\">Test</p>", i % 50));
    }
    big_html.push_str("</div>");

    let mut css = String::new();
    for i in 0..50 {
        css.push_str(&format!(".row-{} {{ margin: {}px; }}\n", i, i));
    }

    c.bench_function("large_document", |b| {
        b.iter(|| {
            let request = ConvertRequest::single(big_html.clone(), css.clone());
            convert_simple(&request, &EmptyRegistry).unwrap()
        })
    });
}

fn bench_embed_heavy(c: &mut Criterion) {
    let html = "<div class=\"a\">x</div>".to_string();
    let mut css = String::new();
    for i in 0..500 {
        css.push_str(&format!(".a .b-{} {{ color: rgb({}, 0, 0); }}\n", i, i % 255));
    }

    c.bench_function("embed_heavy", |b| {
        b.iter(|| {
            let request = ConvertRequest::single(html.clone(), css.clone());
            convert_simple(&request, &EmptyRegistry).unwrap()
        })
    });
}

criterion_group!(benches, bench_large_document, bench_embed_heavy);
criterion_main!(benches);
