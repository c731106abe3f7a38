//! Producer - packs records into a shared-memory buffer
//!
//! Run this first; it writes vertex records and stays alive so the
//! consumer can open the segment and read them back.
//!
//! Usage:
//! ```bash
//! cargo run --example producer
//! ```

use std::rc::Rc;
use std::thread;
use std::time::Duration;

use glbuffers_core::{Buffer, BufferApi, ShmDevice, Value};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let device: Rc<dyn BufferApi> = Rc::new(ShmDevice::new("glb_demo"));

    let buf = Buffer::array(device, "(3f)[vertex](4B)[color]")?;
    buf.set_data(&[
        Value::Seq(vec![
            Value::from([0.0, 0.5, 0.0]),
            Value::from([255.0, 0.0, 0.0, 255.0]),
        ]),
        Value::Seq(vec![
            Value::from([-0.5, -0.5, 0.0]),
            Value::from([0.0, 255.0, 0.0, 255.0]),
        ]),
        Value::Seq(vec![
            Value::from([0.5, -0.5, 0.0]),
            Value::from([0.0, 0.0, 255.0, 255.0]),
        ]),
    ])?;

    println!("Packed {} records ({} bytes) into handle {}", buf.len(), buf.size(), buf.handle());
    println!("Format: {}", buf.format());
    println!("\nBuffer is alive. Press Ctrl+C to exit...");

    loop {
        thread::sleep(Duration::from_secs(1));
    }
}
