use std::env;
use std::path::Path;

use huffman_tool::decompress_file;
use log::{error, info};

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 3 {
        error!("Usage: {} <input_file> <output_file>", args[0]);
        eprintln!("  📂 <input_file>:  path to the encoded file.");
        eprintln!("  💾 <output_file>: path to write the decoded output.");
        std::process::exit(1);
    }

    let input_filepath = Path::new(&args[1]);
    let output_filepath = Path::new(&args[2]);

    info!("--- Start Decoding ---");

    let stats = match decompress_file(input_filepath, output_filepath) {
        Ok(stats) => stats,
        Err(e) => {
            error!("Failed to decode {}: {}", input_filepath.display(), e);
            std::process::exit(1);
        }
    };

    let ratio = if stats.decoded_len > 0 {
        100.0 * (1.0 - stats.compressed_len as f64 / stats.decoded_len as f64)
    } else {
        0.0
    };

    println!(
        "\r\n✅ decoding successful.\n\
         📂 input file:        {} ({} bytes)\n\
         🏷️ original name:     {}\n\
         💾 output file:       {} ({} bytes)\n\
         🗜️ compression ratio: {:.2}% (relative to decoded output)",
        input_filepath.display(),
        stats.compressed_len,
        stats.name,
        output_filepath.display(),
        stats.decoded_len,
        ratio
    );

    info!("--- End ---");
}
