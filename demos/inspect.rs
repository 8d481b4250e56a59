use std::env;
use std::error::Error;
use std::fs;
use std::io::{self, Write};
use std::process;

use gcmemcard::card::{Card, CardFileFormat};

fn main() -> Result<(), Box<dyn Error>> {
    pretty_env_logger::try_init_custom_env("GCMEMCARD_LOG").unwrap();

    let file = match env::args_os().nth(1) {
        Some(file) => file,
        None => {
            println!("usage: inspect <card-image>");
            process::exit(0);
        }
    };

    let bytes = match fs::read(&file) {
        Ok(bytes) => bytes,
        Err(err) => {
            eprintln!("error: {}", err);
            process::exit(1);
        }
    };

    let format = match CardFileFormat::from_extension(&file.to_string_lossy()) {
        Some(format) => format,
        None => {
            eprintln!("error: valid extensions are .raw/.gcp/.mci");
            process::exit(1);
        }
    };

    let card = match Card::load(&bytes, format) {
        Ok(card) => card,
        Err(err) => {
            eprintln!("error: {}", err);
            process::exit(1);
        }
    };

    let stdout = io::stdout();
    let mut f = stdout.lock();
    directory_info(&mut f, &card)?;
    f.flush()?;

    Ok(())
}

fn directory_info<W: io::Write>(mut f: W, card: &Card) -> io::Result<()> {
    writeln!(f, "size:        {:?}", card.size())?;
    writeln!(f, "free blocks: {}", card.free_blocks())?;
    writeln!(f, "files:       {}", card.num_files())?;
    writeln!(f)?;

    for i in 0..card.num_files() {
        let Some(index) = card.file_index(i) else { break };
        let Some(entry) = card.get_dentry(index) else { continue };
        writeln!(
            f,
            "{:40}  blocks={:<4}  first_block={}",
            entry.filename_str(),
            entry.block_count(),
            entry.first_block()
        )?;
    }

    Ok(())
}
