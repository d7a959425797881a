//! Request Dispatch
//!
//! The transport in front of the device (an HTTP server on hardware, a
//! test harness here) parses its own protocol and hands over a method,
//! a path, query params and an optional body. It gets back a status, a
//! content type and a body; shipping those bytes is its problem.
//!
//! Response texts are part of the device's protocol: dashboards match
//! on strings like `Not started` and `Timer and all data reset`, so
//! they are reproduced here verbatim. Numeric parameters are parsed
//! leniently, missing or unparsable input collapsing to zero, except
//! for the threshold endpoints which distinguish a missing `value`
//! param with a 400.

use crate::device::Device;
use crate::persist::SnapshotStore;
use crate::sensor::Sensor;
use crate::settings::KvStore;
use crate::time::Clock;

/// The two request methods the device distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// Read or parameterized action.
    Get,
    /// Body-carrying upload.
    Post,
}

/// A parsed request, borrowed from the transport's buffers.
#[derive(Debug, Clone, Copy)]
pub struct Request<'a> {
    /// Request method.
    pub method: Method,
    /// Path, leading slash included.
    pub path: &'a str,
    /// Decoded query parameters in arrival order.
    pub params: &'a [(&'a str, &'a str)],
    /// Raw request body, empty for GET.
    pub body: &'a [u8],
}

impl<'a> Request<'a> {
    /// Plain GET with no params.
    pub fn get(path: &'a str) -> Self {
        Self {
            method: Method::Get,
            path,
            params: &[],
            body: &[],
        }
    }

    /// GET with query params.
    pub fn get_with(path: &'a str, params: &'a [(&'a str, &'a str)]) -> Self {
        Self {
            method: Method::Get,
            path,
            params,
            body: &[],
        }
    }

    /// POST with a raw body.
    pub fn post(path: &'a str, body: &'a [u8]) -> Self {
        Self {
            method: Method::Post,
            path,
            params: &[],
            body,
        }
    }

    fn param(&self, name: &str) -> Option<&'a str> {
        self.params
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| *value)
    }
}

/// Response status, the subset the device emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// 200
    Ok,
    /// 400
    BadRequest,
    /// 404
    NotFound,
    /// 500
    ServerError,
}

impl Status {
    /// Numeric HTTP status code.
    pub fn code(self) -> u16 {
        match self {
            Status::Ok => 200,
            Status::BadRequest => 400,
            Status::NotFound => 404,
            Status::ServerError => 500,
        }
    }
}

/// What goes back over the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    /// Response status.
    pub status: Status,
    /// MIME type of the body.
    pub content_type: &'static str,
    /// Response body bytes.
    pub body: Vec<u8>,
}

impl Response {
    fn text(status: Status, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type: "text/plain",
            body: body.into().into_bytes(),
        }
    }

    fn json(body: Vec<u8>) -> Self {
        Self {
            status: Status::Ok,
            content_type: "application/json",
            body,
        }
    }

    fn not_found() -> Self {
        Self::text(Status::NotFound, "Not found")
    }

    /// Body as text, for transports and tests that want a `&str`.
    pub fn body_text(&self) -> &str {
        core::str::from_utf8(&self.body).unwrap_or("")
    }
}

/// Route a request to the device and produce its response.
pub fn dispatch<C, S, P, K>(device: &mut Device<C, S, P, K>, request: &Request<'_>) -> Response
where
    C: Clock,
    S: Sensor,
    P: SnapshotStore,
    K: KvStore,
{
    match (request.method, request.path) {
        (Method::Get, "/temperature") => live_value(device.live().map(|m| m.temperature)),
        (Method::Get, "/humidity") => live_value(device.live().map(|m| m.humidity)),
        (Method::Get, "/time") => Response::text(Status::Ok, device.elapsed_text().as_str()),
        (Method::Get, "/starttime") => {
            let timer = device.timer();
            if timer.is_started() {
                Response::text(Status::Ok, timer.start().to_string())
            } else {
                Response::text(Status::Ok, "Not started")
            }
        }
        (Method::Get, "/setstarttime") => {
            let days = parse_or_zero(request.param("days"));
            let hours = parse_or_zero(request.param("hours"));
            device.set_start_retroactive(days, hours);
            Response::text(Status::Ok, "Egg start time updated and history cleared.")
        }
        (Method::Get, "/reset") => {
            device.reset();
            Response::text(Status::Ok, "Timer and all data reset")
        }
        (Method::Get, "/data") => match device.export_json() {
            Ok(json) => Response::json(json.into_bytes()),
            Err(err) => {
                log::error!("history export failed: {err}");
                Response::text(Status::ServerError, "Export failed")
            }
        },
        (Method::Get, "/download") => match device.download_raw() {
            Ok(Some(bytes)) => Response::json(bytes),
            Ok(None) => Response::not_found(),
            Err(err) => {
                log::error!("snapshot read failed: {err:?}");
                Response::text(Status::ServerError, "Snapshot unavailable")
            }
        },
        (Method::Post, "/upload_json") => match device.import_raw(request.body) {
            Ok(_) => Response::text(
                Status::Ok,
                "Upload complete. Reboot device or refresh chart.",
            ),
            Err(err) => {
                log::error!("snapshot upload failed: {err:?}");
                Response::text(Status::ServerError, "Upload failed")
            }
        },
        (Method::Get, "/getthreshold") => {
            Response::text(Status::Ok, format!("{:.1}", device.thresholds().temperature))
        }
        (Method::Get, "/gethumidity") => {
            Response::text(Status::Ok, format!("{:.1}", device.thresholds().humidity))
        }
        (Method::Get, "/setthreshold") => set_alert(device, request, Alert::Temperature),
        (Method::Get, "/sethumidity") => set_alert(device, request, Alert::Humidity),
        _ => Response::not_found(),
    }
}

enum Alert {
    Temperature,
    Humidity,
}

fn set_alert<C, S, P, K>(
    device: &mut Device<C, S, P, K>,
    request: &Request<'_>,
    alert: Alert,
) -> Response
where
    C: Clock,
    S: Sensor,
    P: SnapshotStore,
    K: KvStore,
{
    let raw = match request.param("value") {
        Some(raw) => raw,
        None => return Response::text(Status::BadRequest, "Missing value param"),
    };
    let value = raw
        .trim()
        .parse::<f32>()
        .ok()
        .filter(|v| v.is_finite())
        .unwrap_or(0.0);

    let (outcome, saved_text) = match alert {
        Alert::Temperature => (
            device.set_temperature_alert(value),
            format!("Threshold saved: {value:.1}"),
        ),
        Alert::Humidity => (
            device.set_humidity_alert(value),
            format!("Humidity threshold saved: {value:.1}"),
        ),
    };
    match outcome {
        Ok(()) => Response::text(Status::Ok, saved_text),
        Err(err) => {
            log::error!("threshold write failed: {err:?}");
            Response::text(Status::ServerError, "Failed to open preferences namespace")
        }
    }
}

fn live_value(value: Option<f32>) -> Response {
    match value {
        Some(v) => Response::text(Status::Ok, format!("{v:.1}")),
        None => Response::text(Status::Ok, "Error"),
    }
}

fn parse_or_zero(raw: Option<&str>) -> u32 {
    raw.and_then(|s| s.trim().parse().ok()).unwrap_or(0)
}
