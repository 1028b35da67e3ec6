//! Benchmarks for store/load passes and edit classification.
//!
//! Run with: cargo bench

use criterion::{Criterion, criterion_group, criterion_main};

use wikidom::{
    Document, DomPageBundle, LoadOptions, PageBundle, StaticPageConfig, StoreOptions,
    classify, visit_and_load_data_attribs, visit_and_store_data_attribs,
};

/// A page of `sections` sections, each with a paragraph and a transclusion.
fn sample_html(sections: usize, suffix: &str) -> String {
    let mut body = String::new();
    for i in 0..sections {
        body.push_str(&format!(
            concat!(
                r#"<section data-mw-section-id="{i}"><h2 data-parsoid='{{"dsr":[0,9,3,3]}}'>Heading {i}</h2>"#,
                r#"<p data-parsoid='{{"dsr":[10,40,0,0]}}'>Paragraph {i} with <a href="./Link_{i}">a link</a>.</p>"#,
                r##"<div about="#mwt{n}" typeof="mw:Transclusion" data-mw='{{"parts":[{{"template":"##,
                r#"{{"target":{{"wt":"T{i}","href":"./Template:T{i}"}},"params":{{}},"i":0}}}}]}}'>"#,
                "<span>output {i}{suffix}</span></div></section>",
            ),
            i = i,
            n = i + 1,
            suffix = suffix,
        ));
    }
    format!("<!DOCTYPE html><html><head></head><body>{body}</body></html>")
}

fn page_bundle(html: &str) -> PageBundle {
    let mut doc = Document::parse(html);
    let body = doc.body().unwrap();
    visit_and_load_data_attribs(&mut doc, body, LoadOptions::default()).unwrap();
    PageBundle::from_dom_page_bundle(
        DomPageBundle::from_loaded_document(doc, StoreOptions::default()).unwrap(),
    )
}

// ============================================================================
// Store/Load Benchmarks
// ============================================================================

fn bench_load_store_inline(c: &mut Criterion) {
    let html = sample_html(50, "");

    c.bench_function("load_store_inline", |b| {
        b.iter(|| {
            let mut doc = Document::parse(&html);
            let body = doc.body().unwrap();
            visit_and_load_data_attribs(&mut doc, body, LoadOptions::default()).unwrap();
            visit_and_store_data_attribs(&mut doc, body, StoreOptions::default()).unwrap();
            doc.to_html()
        });
    });
}

fn bench_page_bundle_to_dom(c: &mut Criterion) {
    let pb = page_bundle(&sample_html(50, ""));

    c.bench_function("page_bundle_to_dom", |b| {
        b.iter(|| {
            DomPageBundle::from_page_bundle(pb.clone())
                .unwrap()
                .to_dom(true, None)
                .unwrap()
        });
    });
}

// ============================================================================
// Classification Benchmarks
// ============================================================================

fn bench_classify_template_update(c: &mut Criterion) {
    let old_pb = page_bundle(&sample_html(50, ""));
    let new_pb = page_bundle(&sample_html(50, " (updated)"));
    let old_page = StaticPageConfig::new("Bench", "wt").with_revision(1, None);
    let new_page = StaticPageConfig::new("Bench", "wt").with_revision(1, None);

    c.bench_function("classify_template_update", |b| {
        b.iter(|| classify(Some((&old_page, &old_pb)), &new_page, &new_pb).unwrap());
    });
}

criterion_group!(
    benches,
    // Store/load
    bench_load_store_inline,
    bench_page_bundle_to_dom,
    // Classification
    bench_classify_template_update,
);
criterion_main!(benches);
