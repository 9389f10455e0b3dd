//! Pageturn demo (for testing purposes only)
//! The main interface is through WASM bindings. This paginates a simulated
//! document and prints where each page starts.

use pageturn::{BookConfig, BookRegistry, LayoutHost, Margins, PagingMethod, SimHost};

fn main() {
    println!("Pageturn Pagination Engine");
    println!("==========================");
    println!();

    for method in [PagingMethod::Column, PagingMethod::Vertical] {
        if let Err(e) = run(method) {
            eprintln!("{method:?} demo failed: {e}");
        }
        println!();
    }

    println!("To use from a browser:");
    println!("  1. Build WASM: wasm-pack build --target web");
    println!("  2. Implement the JsHost interface against the DOM");
}

fn run(method: PagingMethod) -> Result<(), pageturn::PagerError> {
    let mut host = SimHost::new(660.0, 800.0);
    let doc = host.document();
    let container = host.append_element(doc, "div");
    let content = host.append_element(container, "article");
    for i in 0..6 {
        let heading = host.append_element(content, "h2");
        host.append_text(heading, &format!("Chapter {}", i + 1));
        let p = host.append_element(content, "p");
        host.append_text(p, &"lorem ipsum dolor sit amet ".repeat(60));
    }

    let config = BookConfig {
        paging_method: method,
        margins: Margins::new(20.0, 20.0, 30.0, 30.0),
        ..BookConfig::default()
    };
    let mut registry = BookRegistry::new();
    let id = registry.create(&mut host, container, content, config)?;
    let book = registry.book_mut(id)?;
    book.enter_paginated(&mut host)?;

    println!("{method:?} paging: {} pages", book.total_pages());
    for (i, starter) in book.starters().iter().enumerate() {
        let text = host.text_content(starter.node);
        let preview: String = text.chars().skip(starter.offset).take(24).collect();
        println!("  page {:>2} starts at {:?}+{}: {preview:?}", i + 1, starter.node, starter.offset);
    }

    book.next_page(&mut host);
    println!("  after next: page {} of {}", book.current_page(), book.total_pages());
    book.enter_scroll(&mut host)?;
    Ok(())
}
