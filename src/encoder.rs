use std::env;
use std::path::PathBuf;

use huffman_tool::compress_file;
use log::{error, info};

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        error!("Usage: {} <input_file> [output_file]", args[0]);
        eprintln!("  📂 <input_file>:  path to the file to encode.");
        eprintln!("  💾 [output_file]: optional, defaults to '<input_file>.huff'.");
        std::process::exit(1);
    }

    let input_filepath = PathBuf::from(&args[1]);
    let output_filepath = match args.get(2) {
        Some(path) => PathBuf::from(path),
        None => PathBuf::from(format!("{}.huff", args[1])),
    };

    info!("--- Start Encoding ---");

    let stats = match compress_file(&input_filepath, &output_filepath) {
        Ok(stats) => stats,
        Err(e) => {
            error!("Failed to encode {}: {}", input_filepath.display(), e);
            std::process::exit(1);
        }
    };

    println!(
        "\r\n✅ Encoding successful.\n\
         📂  Input:       {} ({} bytes)\n\
         💾  Output:      {} ({} bytes, header {} bytes)\n\
         🔣  Symbols:     {} unique\n\
         ℹ️  Entropy:     {:.4} bits/symbol\n\
         🗜️  Ratio:       {:.4}%",
        input_filepath.display(),
        stats.original_len,
        output_filepath.display(),
        stats.compressed_len,
        stats.header_len,
        stats.distinct_symbols,
        stats.entropy,
        stats.ratio()
    );

    info!("--- End ---");
}
