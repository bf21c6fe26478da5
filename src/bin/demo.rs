//! Modbus Link Demo
//!
//! Demonstrates frame construction for both framings and, when a server
//! address is given, a live read/write cycle against it.
//!
//! Usage: cargo run --bin demo [server_address] [tcp|rtu]
//! Example: cargo run --bin demo 127.0.0.1:502 tcp

use std::sync::Arc;

use modbus_link::{
    crc::checksum, ConnectionState, FramingMode, ModbusClient, ModbusTcpClient, StateCallback,
    DEFAULT_UNIT_ID,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Modbus Link v{} Demo", modbus_link::VERSION);
    println!("=========================\n");

    // =========================================================================
    // Part 1: Frame construction (no connection required)
    // =========================================================================
    println!("Part 1: Request frames");
    println!("----------------------");

    for mode in [FramingMode::Tcp, FramingMode::RtuOverTcp] {
        let read = mode.build_read_request(DEFAULT_UNIT_ID, 0x006B, 3);
        println!("  {:?} FC03 request:  {:02X?}", mode, read);

        let write = mode.build_write_request(DEFAULT_UNIT_ID, 0x0001, &[0x000A, 0x0102])?;
        println!("  {:?} FC16 request:  {:02X?}", mode, write);
    }

    println!("\n  CRC-16/MODBUS check value: {:#06X}", checksum(b"123456789"));

    // =========================================================================
    // Part 2: Live exchange (requires a reachable server)
    // =========================================================================
    let Some(addr) = std::env::args().nth(1) else {
        println!("\nNo server address given, skipping live demo.");
        return Ok(());
    };
    let framing = match std::env::args().nth(2).as_deref() {
        Some("rtu") => FramingMode::RtuOverTcp,
        _ => FramingMode::Tcp,
    };

    println!("\nPart 2: Live exchange with {} ({:?} framing)", addr, framing);
    println!("--------------------------------------------");

    let (host, port) = addr
        .rsplit_once(':')
        .ok_or("address must be host:port")?;
    let on_state: StateCallback =
        Arc::new(|state: ConnectionState| println!("  connection state: {}", state));

    let mut client =
        ModbusTcpClient::connect(host, port.parse()?, framing, Some(on_state)).await?;

    let registers = client.read_holding_registers(DEFAULT_UNIT_ID, 0, 10).await?;
    println!("  read 10 registers at 0: {:?}", registers);

    client
        .write_holding_registers(DEFAULT_UNIT_ID, 100, &[0x1234, 0x5678])
        .await?;
    println!("  wrote 2 registers at 100");

    let stats = client.get_stats();
    println!(
        "  stats: {} requests, {} responses, {}B out, {}B in",
        stats.requests_sent, stats.responses_received, stats.bytes_sent, stats.bytes_received
    );

    client.close().await?;
    Ok(())
}
