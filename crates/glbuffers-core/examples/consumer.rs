//! Consumer - opens the producer's segment and unpacks its records
//!
//! Run while the producer is alive.
//!
//! Usage:
//! ```bash
//! cargo run --example consumer
//! ```

use glbuffers_core::{RecordLayout, ShmDevice};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // the producer's first allocation gets handle 1
    let bytes = ShmDevice::open_bytes("glb_demo", 1)?;
    println!("Opened segment, {} bytes", bytes.len());

    // the segment length is page-rounded; the producer packs three records
    let layout = RecordLayout::from_string("(3f)[vertex](4B)[color]")?;
    for (i, item) in layout.unpack_bytes(&bytes).iter().take(3).enumerate() {
        let vertex = &item["vertex"];
        let color = &item["color"];
        println!("record {}: vertex {:?} color {:?}", i, vertex, color);
    }

    Ok(())
}
