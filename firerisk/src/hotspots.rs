//! Récupération des détections de feux actifs (flux FIRMS, CSV)
//!
//! Un seul GET par appel, timeout borné, pas de retry. Un CSV réduit à son
//! en-tête signifie « aucune détection » et donne une liste vide ; toute autre
//! anomalie (réseau, statut HTTP, corps vide ou sans colonnes de position) est
//! une `FeedUnavailable`.

use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::boundary::CountryBoundary;
use crate::error::{FireRiskError, Result};
use crate::types::{BoundingBox, GeoPoint, HotspotObservation};

pub const DEFAULT_BASE_URL: &str = "https://firms.modaps.eosdis.nasa.gov/api/area/csv";
pub const DEFAULT_SOURCE: &str = "VIIRS_NOAA21_NRT";
pub const DEFAULT_LOOKBACK_DAYS: u32 = 1;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Paramètres du flux
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    pub base_url: String,

    /// Clé d'API (jamais journalisée)
    #[serde(skip_serializing)]
    pub api_key: String,

    pub source: String,
    pub timeout_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: String::new(),
            source: DEFAULT_SOURCE.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Client du flux de hotspots
#[derive(Debug, Clone)]
pub struct HotspotFeed {
    config: FeedConfig,
    client: Client,
}

impl HotspotFeed {
    pub fn new(config: FeedConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| FireRiskError::feed_with_source("cannot build HTTP client", e))?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    /// `{base}/{key}/{source}/{west},{south},{east},{north}/{days}`
    pub fn url(&self, bbox: &BoundingBox, lookback_days: u32) -> String {
        self.url_with_key(&self.config.api_key, bbox, lookback_days)
    }

    /// URL avec la clé masquée, pour les logs
    pub fn redacted_url(&self, bbox: &BoundingBox, lookback_days: u32) -> String {
        self.url_with_key("***", bbox, lookback_days)
    }

    fn url_with_key(&self, key: &str, bbox: &BoundingBox, lookback_days: u32) -> String {
        format!(
            "{}/{}/{}/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            key,
            self.config.source,
            bbox,
            lookback_days
        )
    }

    /// Récupère les détections dans l'emprise et ne garde que celles du pays
    ///
    /// # Errors
    ///
    /// `FeedUnavailable` en cas d'échec réseau, de statut HTTP d'erreur ou de
    /// réponse malformée.
    pub async fn fetch(
        &self,
        bbox: &BoundingBox,
        region: &CountryBoundary,
        lookback_days: u32,
    ) -> Result<Vec<HotspotObservation>> {
        bbox.validate()?;
        if lookback_days == 0 {
            return Err(FireRiskError::InvalidParameter(
                "lookback must be at least one day".to_string(),
            ));
        }

        let redacted = self.redacted_url(bbox, lookback_days);
        debug!(url = %redacted, "Fetching hotspot feed");

        let response = self
            .client
            .get(self.url(bbox, lookback_days))
            .send()
            .await
            .map_err(|e| FireRiskError::feed_with_source(format!("GET {} failed", redacted), e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FireRiskError::feed(format!(
                "GET {} returned HTTP {}",
                redacted, status
            )));
        }

        let body = response.text().await.map_err(|e| {
            FireRiskError::feed_with_source(format!("cannot read body from {}", redacted), e)
        })?;

        let observations = parse_csv(&body, &self.config.source)?;
        let fetched = observations.len();
        let kept = filter_region(observations, region);

        info!(
            source = %self.config.source,
            days = lookback_days,
            fetched = fetched,
            kept = kept.len(),
            region = region.name(),
            "Hotspots fetched"
        );

        Ok(kept)
    }
}

/// Ne garde que les détections qui touchent la frontière
pub fn filter_region(
    observations: Vec<HotspotObservation>,
    region: &CountryBoundary,
) -> Vec<HotspotObservation> {
    observations
        .into_iter()
        .filter(|o| region.intersects(o.point))
        .collect()
}

/// Nom de colonne normalisé (`lat` → `latitude`, `lon`/`lng` → `longitude`)
fn normalize_header(header: &str) -> String {
    let header = header.trim().to_ascii_lowercase();
    match header.as_str() {
        "lat" => "latitude".to_string(),
        "lon" | "lng" => "longitude".to_string(),
        _ => header,
    }
}

/// Parse le CSV du flux
pub fn parse_csv(body: &str, source: &str) -> Result<Vec<HotspotObservation>> {
    if body.trim().is_empty() {
        return Err(FireRiskError::feed("feed returned an empty body"));
    }

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(body.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| FireRiskError::feed_with_source("cannot read CSV header", e))?
        .iter()
        .map(normalize_header)
        .collect();

    let column = |name: &str| headers.iter().position(|h| h == name);

    let (Some(lat_idx), Some(lon_idx)) = (column("latitude"), column("longitude")) else {
        let first_line = body.lines().next().unwrap_or_default();
        return Err(FireRiskError::feed(format!(
            "response has no latitude/longitude columns: '{}'",
            first_line.chars().take(120).collect::<String>()
        )));
    };

    let date_idx = column("acq_date");
    let time_idx = column("acq_time");
    let satellite_idx = column("satellite");
    let instrument_idx = column("instrument");
    let confidence_idx = column("confidence");
    let frp_idx = column("frp");

    let mut observations = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record =
            record.map_err(|e| FireRiskError::feed_with_source("malformed CSV record", e))?;

        let text = |idx: Option<usize>| {
            idx.and_then(|i| record.get(i))
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        let coord = |idx: usize, name: &str| -> Result<f64> {
            let raw = record.get(idx).unwrap_or_default();
            raw.parse::<f64>().map_err(|_| {
                FireRiskError::feed(format!("record {}: invalid {} '{}'", line + 1, name, raw))
            })
        };

        let lat = coord(lat_idx, "latitude")?;
        let lon = coord(lon_idx, "longitude")?;

        observations.push(HotspotObservation {
            point: GeoPoint::new(lat, lon),
            acquired_at: acquisition_time(text(date_idx).as_deref(), text(time_idx).as_deref()),
            source: source.to_string(),
            satellite: text(satellite_idx),
            instrument: text(instrument_idx),
            confidence: text(confidence_idx),
            frp: text(frp_idx).and_then(|v| v.parse().ok()),
        });
    }

    Ok(observations)
}

/// `acq_date` (AAAA-MM-JJ) + `acq_time` (HHMM, zéros de tête parfois omis)
fn acquisition_time(date: Option<&str>, time: Option<&str>) -> Option<NaiveDateTime> {
    let date = NaiveDate::parse_from_str(date?, "%Y-%m-%d").ok()?;
    let time = match time {
        Some(t) => {
            let t = format!("{:0>4}", t);
            NaiveTime::parse_from_str(&t, "%H%M").ok()?
        }
        None => NaiveTime::MIN,
    };
    Some(date.and_time(time))
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{polygon, MultiPolygon};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const VIIRS_CSV: &str = "latitude,longitude,bright_ti4,scan,track,acq_date,acq_time,satellite,instrument,confidence,version,bright_ti5,frp,daynight\n\
        45.12,25.34,330.1,0.4,0.4,2024-08-01,1142,N21,VIIRS,n,2.0NRT,290.2,5.3,D\n\
        44.01,23.50,340.7,0.5,0.4,2024-08-01,34,N21,VIIRS,h,2.0NRT,295.0,12.9,N\n\
        50.00,35.00,310.0,0.4,0.4,2024-08-01,1200,N21,VIIRS,l,2.0NRT,280.0,1.1,D\n";

    fn romania() -> CountryBoundary {
        let poly = polygon![
            (x: 20.0, y: 43.5),
            (x: 30.0, y: 43.5),
            (x: 30.0, y: 48.5),
            (x: 20.0, y: 48.5),
            (x: 20.0, y: 43.5),
        ];
        CountryBoundary::from_geometry("Romania", MultiPolygon::new(vec![poly]), 4326).unwrap()
    }

    fn bbox() -> BoundingBox {
        BoundingBox::new(20.2, 43.6, 29.7, 48.3)
    }

    /// Serveur HTTP minimal : une réponse, puis fermeture. Renvoie la ligne de requête.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 8192];
            let n = socket.read(&mut buf).await.unwrap();
            let request = String::from_utf8_lossy(&buf[..n]).to_string();

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: text/csv\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();

            request.lines().next().unwrap_or_default().to_string()
        });

        (base, handle)
    }

    fn feed(base: String) -> HotspotFeed {
        HotspotFeed::new(FeedConfig {
            base_url: base,
            api_key: "SECRET".to_string(),
            timeout_secs: 5,
            ..FeedConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_url_template() {
        let feed = feed(DEFAULT_BASE_URL.to_string());
        assert_eq!(
            feed.url(&bbox(), 1),
            "https://firms.modaps.eosdis.nasa.gov/api/area/csv/SECRET/VIIRS_NOAA21_NRT/20.2,43.6,29.7,48.3/1"
        );
        assert!(!feed.redacted_url(&bbox(), 1).contains("SECRET"));
    }

    #[test]
    fn test_parse_metadata() {
        let obs = parse_csv(VIIRS_CSV, "VIIRS_NOAA21_NRT").unwrap();
        assert_eq!(obs.len(), 3);
        assert_eq!(obs[0].point, GeoPoint::new(45.12, 25.34));
        assert_eq!(obs[0].satellite.as_deref(), Some("N21"));
        assert_eq!(obs[0].frp, Some(5.3));
        assert_eq!(
            obs[0].acquired_at.unwrap().to_string(),
            "2024-08-01 11:42:00"
        );
        // acq_time "34" = 00:34
        assert_eq!(
            obs[1].acquired_at.unwrap().to_string(),
            "2024-08-01 00:34:00"
        );
    }

    #[test]
    fn test_short_column_names() {
        let obs = parse_csv("lat,lng\n45.0,25.0\n", "X").unwrap();
        assert_eq!(obs[0].point, GeoPoint::new(45.0, 25.0));
        assert_eq!(obs[0].acquired_at, None);
    }

    #[test]
    fn test_header_only_is_empty() {
        let obs = parse_csv("latitude,longitude,acq_date\n", "X").unwrap();
        assert!(obs.is_empty());
    }

    #[test]
    fn test_malformed_responses() {
        assert!(parse_csv("", "X").unwrap_err().is_feed_unavailable());
        assert!(parse_csv("Invalid MAP_KEY.", "X")
            .unwrap_err()
            .is_feed_unavailable());
        assert!(parse_csv("latitude,longitude\nabc,25\n", "X")
            .unwrap_err()
            .is_feed_unavailable());
    }

    #[tokio::test]
    async fn test_fetch_filters_by_region() {
        let (base, server) = serve_once("200 OK", VIIRS_CSV).await;
        let obs = feed(base).fetch(&bbox(), &romania(), 1).await.unwrap();

        // Le point (50, 35) est hors du pays
        assert_eq!(obs.len(), 2);
        assert!(obs.iter().all(|o| o.source == "VIIRS_NOAA21_NRT"));

        let request_line = server.await.unwrap();
        assert!(request_line.starts_with(
            "GET /SECRET/VIIRS_NOAA21_NRT/20.2,43.6,29.7,48.3/1 "
        ));
    }

    #[tokio::test]
    async fn test_fetch_no_detections() {
        let (base, _server) = serve_once("200 OK", "latitude,longitude,acq_date,acq_time\n").await;
        let obs = feed(base).fetch(&bbox(), &romania(), 1).await.unwrap();
        assert!(obs.is_empty());
    }

    #[tokio::test]
    async fn test_fetch_http_error() {
        let (base, _server) = serve_once("500 Internal Server Error", "oops").await;
        let err = feed(base).fetch(&bbox(), &romania(), 1).await.unwrap_err();
        assert!(err.is_feed_unavailable());
    }

    #[tokio::test]
    async fn test_fetch_unreachable() {
        // Port réservé puis libéré : rien n'écoute
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = feed(format!("http://{}", addr))
            .fetch(&bbox(), &romania(), 1)
            .await
            .unwrap_err();
        assert!(err.is_feed_unavailable());
    }
}
