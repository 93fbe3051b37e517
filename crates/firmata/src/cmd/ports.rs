use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use firmata_transport::{available_ports, PortInfo};
use serde::Serialize;

use crate::cmd::PortsArgs;
use crate::exit::{transport_error, CliResult, SUCCESS};
use crate::output::{print_json, OutputFormat};

#[derive(Serialize)]
struct PortOutput<'a> {
    path: &'a str,
    kind: &'a str,
    vid: Option<String>,
    pid: Option<String>,
    product: Option<&'a str>,
}

impl<'a> From<&'a PortInfo> for PortOutput<'a> {
    fn from(port: &'a PortInfo) -> Self {
        Self {
            path: &port.path,
            kind: port.kind,
            vid: port.vid.map(|id| format!("{id:04x}")),
            pid: port.pid.map(|id| format!("{id:04x}")),
            product: port.product.as_deref(),
        }
    }
}

pub fn run(args: PortsArgs, format: OutputFormat) -> CliResult<i32> {
    let ports: Vec<PortInfo> = available_ports()
        .map_err(|err| transport_error("port enumeration failed", err))?
        .into_iter()
        .filter(|port| !args.usb || port.kind == "usb")
        .collect();
    let out: Vec<PortOutput<'_>> = ports.iter().map(PortOutput::from).collect();

    match format {
        OutputFormat::Json => print_json(&out),
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["PATH", "KIND", "VID:PID", "PRODUCT"]);
            for port in &out {
                table.add_row(vec![
                    port.path.to_string(),
                    port.kind.to_string(),
                    usb_id(port),
                    port.product.unwrap_or_default().to_string(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            if out.is_empty() {
                println!("no serial ports found");
            }
            for port in &out {
                println!("{} ({}) {}", port.path, port.kind, usb_id(port));
            }
        }
    }

    Ok(SUCCESS)
}

fn usb_id(port: &PortOutput<'_>) -> String {
    match (&port.vid, &port.pid) {
        (Some(vid), Some(pid)) => format!("{vid}:{pid}"),
        _ => String::new(),
    }
}
