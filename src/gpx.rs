//! Track file parser.
//!
//! Reads trackpoint-exchange (GPX) text into an ordered [`Track`]. Elements are
//! matched by local name, so `<trkpt>`, `<gpx:trkpt>` and default-namespace
//! documents all parse the same way.

use log::warn;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use crate::error::{Result, RouteError};
use crate::{GeoPoint, Track};

/// Parse track text into points, preserving source order.
///
/// A point without an `<ele>` child gets elevation `0.0`. A missing or
/// unparsable `lat`/`lon` attribute fails with [`RouteError::Parse`] naming the
/// offending `trkpt`.
pub fn parse_track(content: &str) -> Result<Track> {
    let mut reader = Reader::from_str(content);
    reader.trim_text(true);

    let mut points: Track = Vec::new();
    // Point currently open, waiting for its optional <ele>
    let mut current: Option<GeoPoint> = None;
    let mut in_ele = false;
    let mut index = 0usize;
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"trkpt" => {
                    index += 1;
                    current = Some(parse_trackpoint(e, index)?);
                }
                b"ele" if current.is_some() => in_ele = true,
                _ => {}
            },
            Ok(Event::Empty(ref e)) => {
                if e.local_name().as_ref() == b"trkpt" {
                    index += 1;
                    points.push(parse_trackpoint(e, index)?);
                }
            }
            Ok(Event::Text(e)) => {
                if in_ele {
                    if let Some(point) = current.as_mut() {
                        let text = e.unescape().map_err(|err| {
                            RouteError::parse(format!("trkpt #{} ele", index), err.to_string())
                        })?;
                        point.elevation = parse_elevation(&text, index);
                    }
                }
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"trkpt" => {
                    if let Some(point) = current.take() {
                        points.push(point);
                    }
                    in_ele = false;
                }
                b"ele" => in_ele = false,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(RouteError::parse(
                    "document",
                    format!("XML error at position {}: {}", reader.buffer_position(), e),
                ));
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(points)
}

fn parse_trackpoint(event: &BytesStart<'_>, index: usize) -> Result<GeoPoint> {
    let element = format!("trkpt #{}", index);
    let mut lat: Option<f64> = None;
    let mut lng: Option<f64> = None;

    for attr in event.attributes() {
        let attr = attr.map_err(|e| RouteError::parse(&element, e.to_string()))?;
        let value = attr
            .unescape_value()
            .map_err(|e| RouteError::parse(&element, e.to_string()))?;
        match attr.key.local_name().as_ref() {
            b"lat" => lat = Some(parse_coordinate(&value, "lat", &element)?),
            b"lon" => lng = Some(parse_coordinate(&value, "lon", &element)?),
            _ => {}
        }
    }

    let lat = lat.ok_or_else(|| RouteError::parse(&element, "missing `lat` attribute"))?;
    let lng = lng.ok_or_else(|| RouteError::parse(&element, "missing `lon` attribute"))?;

    let point = GeoPoint::new(lat, lng, 0.0);
    if !point.is_valid() {
        return Err(RouteError::parse(
            &element,
            format!("coordinates out of range ({}, {})", lat, lng),
        ));
    }
    Ok(point)
}

fn parse_coordinate(value: &str, name: &str, element: &str) -> Result<f64> {
    value
        .trim()
        .parse::<f64>()
        .map_err(|e| RouteError::parse(element, format!("invalid `{}` value {:?}: {}", name, value, e)))
}

/// Elevation is optional data; unreadable text degrades to sea level.
fn parse_elevation(text: &str, index: usize) -> f64 {
    match text.trim().parse::<f64>() {
        Ok(ele) if ele.is_finite() => ele,
        _ => {
            warn!("[TrackParser] trkpt #{} has unreadable elevation {:?}", index, text);
            0.0
        }
    }
}
