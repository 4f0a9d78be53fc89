use std::fs;
use std::sync::Arc;

use tempfile::tempdir;

use filejacket::storage::LocalStorage;
use filejacket::{File, KnownMimeTyper, SaveOptions, Storage};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    // 1. Create a temporary directory holding our source file.
    let dir = tempdir()?;
    let source_path = dir.path().join("notes.txt");
    fs::write(&source_path, "Hello from filejacket!\nSecond line.\n")?;
    println!("Source file written to: {:?}", source_path);

    let storage: Arc<dyn Storage> = Arc::new(LocalStorage::new());
    let mimetyper = KnownMimeTyper::new_arc();

    // --- Build a file object from the path ---
    println!("\nBuilding a file object from the path...");
    let mut file = File::from_disk(&source_path.to_string_lossy(), storage.clone(), mimetyper.clone());
    println!("File object ready!");
    println!("  - filename:  {:?}", file.filename);
    println!("  - extension: {:?}", file.extension);
    println!("  - mimetype:  {:?}", file.mime_type);
    println!("  - length:    {} bytes", file.length);
    assert_eq!(file.filename.as_deref(), Some("notes"));
    assert_eq!(file.mime_type.as_deref(), Some("text/plain"));

    // --- Generate digests ---
    println!("\nGenerating digests over the content...");
    file.generate_hashes(false);
    let sha256 = file.hashes.digest_of("sha256").unwrap().to_string();
    let crc32 = file.hashes.digest_of("crc32").unwrap().to_string();
    println!("  - sha256: {}", sha256);
    println!("  - crc32:  {}", crc32);

    // --- Save to a new directory, sidecar manifests included ---
    let target = tempdir()?;
    println!("\nSaving into {:?} with hash sidecars...", target.path());
    file.save_to = Some(target.path().to_string_lossy().into_owned());
    file.save(&SaveOptions {
        save_hashes: true,
        ..SaveOptions::default()
    })?;
    println!("Saved! The directory now holds:");
    for name in storage.list_files(&target.path().to_string_lossy())? {
        println!("  - {}", name);
    }

    // --- Reload and verify ---
    println!("\nReloading the saved copy...");
    let saved_path = target.path().join("notes.txt");
    let mut reloaded = File::from_disk(&saved_path.to_string_lossy(), storage, mimetyper);
    println!(
        "Digest loaded from the sidecar manifest: {:?}",
        reloaded.hashes.digest_of("sha256")
    );
    assert_eq!(reloaded.hashes.digest_of("sha256"), Some(sha256.as_str()));

    let wholesome = reloaded.is_content_wholesome()?;
    println!("Content verified against every digest: {:?}", wholesome);
    assert_eq!(wholesome, Some(true));

    println!("\nExample finished successfully!");
    Ok(())
}
