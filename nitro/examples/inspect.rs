use std::fs;

use nitro::SwfDocument;
use nitro::mapper::{AliasTable, LegacyDocuments, needed_sprites};

fn main() {
    let path = std::env::args().nth(1).expect("Usage: inspect <file.swf>");
    let data = fs::read(&path).expect("read file");
    let doc = SwfDocument::parse(&data).expect("parse");
    let base = nitro::base_name(&path);

    println!("File: {} (base name {})", path, base);
    println!(
        "Container: {:?}, version {}, declared length {}",
        doc.header.compression, doc.header.version, doc.header.file_length
    );
    println!("Images: {}", doc.image_count());

    println!("\nSymbols:");
    for symbol in doc.symbols() {
        let kind = if doc.has_image(symbol.id) {
            match doc.image_tag(symbol.id) {
                Some(tag) => format!("image tag {}", tag.kind.code()),
                None => "image".to_string(),
            }
        } else if let Some(bytes) = doc.binary_data(symbol.id) {
            format!("binary, {} bytes", bytes.len())
        } else {
            "-".to_string()
        };
        println!("  {:>5}  {:<50} {}", symbol.id, symbol.name, kind);
    }

    let docs = LegacyDocuments::load(&doc);
    println!("\nDocuments:");
    println!("  assets:        {}", docs.assets.is_some());
    println!("  visualization: {}", docs.visualization.is_some());
    println!("  logic:         {}", docs.logic.is_some());
    println!("  index:         {}", docs.index.is_some());
    println!("  manifest:      {}", docs.manifest.is_some());

    let aliases = AliasTable::build(&doc, &base);
    let mut needed: Vec<String> = needed_sprites(docs.assets.as_ref(), &aliases)
        .into_iter()
        .collect();
    needed.sort();

    println!("\nAliases: {}", aliases.len());
    println!("Sprites to pack: {}", needed.len());
    for name in &needed {
        println!("  {}", name);
    }
}
