//! Benchmarks for the pagination engine

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use pageturn::{Book, BookConfig, ContentOffset, Frame, LayoutHost, Margins, NodeId, SimHost};

fn margins() -> Margins {
    Margins::new(20.0, 20.0, 30.0, 30.0)
}

/// A book over `paragraphs` paragraphs of 20 lines each
fn book(config: BookConfig, paragraphs: usize) -> (SimHost, Book) {
    let mut host = SimHost::new(660.0, 800.0);
    let doc = host.document();
    let container = host.append_element(doc, "div");
    let content = host.append_element(container, "article");
    for _ in 0..paragraphs {
        let p = host.append_element(content, "p");
        host.append_text(p, &"abcd ".repeat(240));
    }
    let book = Book::new(1, Frame::new(container, content), config).unwrap();
    (host, book)
}

fn column_config() -> BookConfig {
    BookConfig {
        margins: margins(),
        ..BookConfig::default()
    }
}

fn vertical_config() -> BookConfig {
    BookConfig {
        margins: margins(),
        ..BookConfig::vertical()
    }
}

fn bench_column_recompute(c: &mut Criterion) {
    c.bench_function("column_recompute_30_pages", |b| {
        let (mut host, mut book) = book(column_config(), 50);
        book.enter_paginated(&mut host).unwrap();
        b.iter(|| {
            black_box(book.reset_pages(&mut host).unwrap());
        });
    });
}

fn bench_vertical_recompute(c: &mut Criterion) {
    c.bench_function("vertical_recompute_with_media", |b| {
        let (mut host, mut book) = book(vertical_config(), 20);
        let content = book.frame().content;
        for height in [300.0, 860.0, 500.0] {
            let item = host.append_element(content, "div");
            host.add_class(item, "pageItem");
            let img = host.append_element(item, "img");
            host.set_intrinsic_size(img, 600.0, height);
        }
        book.enter_paginated(&mut host).unwrap();
        b.iter(|| {
            black_box(book.reset_pages(&mut host).unwrap());
        });
    });
}

fn bench_navigation(c: &mut Criterion) {
    c.bench_function("next_prev_page", |b| {
        let (mut host, mut book) = book(column_config(), 50);
        book.enter_paginated(&mut host).unwrap();
        b.iter(|| {
            if book.next_page(&mut host).is_none() {
                book.set_current_page(&mut host, 1);
            }
        });
    });
}

fn bench_page_for_offset(c: &mut Criterion) {
    c.bench_function("page_for_offset", |b| {
        let (mut host, mut book) = book(column_config(), 50);
        book.enter_paginated(&mut host).unwrap();
        let content = book.frame().content;
        let last: NodeId = host.children(content)[49];
        let text = host.children(last)[0];
        let offset = ContentOffset::new(text, 600);
        b.iter(|| {
            black_box(book.page_for_offset(&host, black_box(&offset)));
        });
    });
}

criterion_group!(
    benches,
    bench_column_recompute,
    bench_vertical_recompute,
    bench_navigation,
    bench_page_for_offset,
);

criterion_main!(benches);
