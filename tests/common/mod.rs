//! Shared fixtures for integration tests: mock HTTP servers, bundle archives
//! and realtime feeds.

#![allow(dead_code)]

use std::io::Write;

use axum::Router;
use prost::Message;
use tokio::net::TcpListener;
use transit_watchdog::gtfs_rt::{FeedEntity, FeedHeader, FeedMessage, VehiclePosition};
use zip::write::SimpleFileOptions;

pub const AGENCY_TXT: &str = "agency_id,agency_name,agency_url,agency_timezone\n\
    1,Metro Transit,https://metro.example.com,America/Los_Angeles\n\
    40,Sound Transit,https://st.example.com,America/Los_Angeles\n";

pub const CALENDAR_TXT: &str =
    "service_id,monday,tuesday,wednesday,thursday,friday,saturday,sunday,start_date,end_date\n\
    WKD,1,1,1,1,1,0,0,20240901,20241122\n\
    WKE,0,0,0,0,0,1,1,20240901,20250328\n";

/// Serves `router` on an ephemeral local port and returns its base URL.
pub async fn spawn(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// Builds an in-memory zip archive from `(file name, contents)` pairs.
pub fn zip_bytes(files: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(zip::CompressionMethod::Stored);
    for (name, contents) in files {
        writer.start_file(*name, options).unwrap();
        writer.write_all(contents.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// A bundle with two agencies and end dates 2024-11-22 / 2025-03-28.
pub fn sample_bundle() -> Vec<u8> {
    zip_bytes(&[("agency.txt", AGENCY_TXT), ("calendar.txt", CALENDAR_TXT)])
}

/// An encoded realtime feed with `vehicles` vehicle entities and one trip update.
pub fn vehicle_feed(vehicles: usize) -> Vec<u8> {
    let mut entity: Vec<FeedEntity> = (0..vehicles)
        .map(|i| FeedEntity {
            id: format!("vehicle-{i}"),
            vehicle: Some(VehiclePosition::default()),
            ..Default::default()
        })
        .collect();
    entity.push(FeedEntity {
        id: "trip-0".to_string(),
        trip_update: Some(Default::default()),
        ..Default::default()
    });

    FeedMessage {
        header: FeedHeader {
            gtfs_realtime_version: "2.0".to_string(),
            timestamp: Some(1736712998),
            ..Default::default()
        },
        entity,
    }
    .encode_to_vec()
}

/// JSON body of the current-time endpoint.
pub fn current_time_json(readable_time: &str) -> String {
    format!(
        concat!(
            r#"{{"code":200,"currentTime":1736712998000,"data":{{"entry":{{"#,
            r#""readableTime":"{readable_time}","time":1736712998000}},"#,
            r#""references":{{}}}},"text":"OK","version":2}}"#
        ),
        readable_time = readable_time
    )
}

/// JSON body of a list endpoint with `count` entries.
pub fn list_json(count: usize) -> String {
    let items: Vec<String> = (0..count).map(|i| format!(r#"{{"id":"{i}"}}"#)).collect();
    format!(
        concat!(
            r#"{{"code":200,"data":{{"limitExceeded":false,"list":[{}],"#,
            r#""references":{{}}}},"text":"OK","version":2}}"#
        ),
        items.join(",")
    )
}
