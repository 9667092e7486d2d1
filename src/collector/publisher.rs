use crate::domain::MetricPoint;
use crate::encoder::{EncodingError, current_timestamp};
use crate::pipeline::Pipeline;
use std::sync::Arc;

pub const SENSOR_MEASUREMENT: &str = "measurements";
pub const DEFAULT_SOURCE: &str = "instrumentacao";

/// Calibrated value of one acquisition channel.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelReading {
    pub id: String,
    pub value: f64,
    pub active: bool,
}

impl ChannelReading {
    pub fn new(id: impl Into<String>, value: f64) -> Self {
        Self {
            id: id.into(),
            value,
            active: true,
        }
    }
}

/// Position fix. Components without a valid reading are NaN.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GpsFix {
    pub latitude: f64,
    pub longitude: f64,
    pub altitude: f64,
    pub speed: f64,
}

impl Default for GpsFix {
    fn default() -> Self {
        Self {
            latitude: f64::NAN,
            longitude: f64::NAN,
            altitude: f64::NAN,
            speed: f64::NAN,
        }
    }
}

/// Turns one acquisition cycle into the node's standard point and submits it.
pub struct SensorPublisher {
    pipeline: Arc<Pipeline>,
    source: String,
}

impl SensorPublisher {
    pub fn new(pipeline: Arc<Pipeline>, source: impl Into<String>) -> Self {
        Self {
            pipeline,
            source: source.into(),
        }
    }

    pub fn publish(&self, channels: &[ChannelReading], gps: &GpsFix) -> Result<(), EncodingError> {
        let point = build_point(&self.source, channels, gps, current_timestamp());
        self.pipeline.submit_point(&point)
    }
}

/// One double field per active channel, then each finite GPS component.
pub fn build_point(
    source: &str,
    channels: &[ChannelReading],
    gps: &GpsFix,
    timestamp: i64,
) -> MetricPoint {
    let mut point = MetricPoint::new(SENSOR_MEASUREMENT)
        .tag("source", source)
        .timestamp(timestamp);

    for channel in channels.iter().filter(|c| c.active) {
        point = point.field(channel.id.as_str(), channel.value);
    }

    let gps_fields = [
        ("latitude", gps.latitude),
        ("longitude", gps.longitude),
        ("altitude", gps.altitude),
        ("speed", gps.speed),
    ];
    for (key, value) in gps_fields {
        if value.is_finite() {
            point = point.field(key, value);
        }
    }

    point
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_with_channels_and_partial_fix() {
        let channels = [
            ChannelReading::new("pressure", 101.325),
            ChannelReading {
                active: false,
                ..ChannelReading::new("spare", 0.0)
            },
            ChannelReading::new("temp", -3.5),
        ];
        let gps = GpsFix {
            latitude: -23.55,
            longitude: -46.63,
            ..GpsFix::default()
        };

        let record = build_point(DEFAULT_SOURCE, &channels, &gps, 1_700_000_000)
            .encode()
            .unwrap();
        assert_eq!(
            record.as_str(),
            "measurements,source=instrumentacao pressure=101.325000,temp=-3.500000,\
             latitude=-23.550000,longitude=-46.630000 1700000000\n"
        );
    }

    #[test]
    fn test_no_fix_and_no_channels_cannot_encode() {
        let point = build_point(DEFAULT_SOURCE, &[], &GpsFix::default(), 1);
        assert!(!point.has_fields());
        assert_eq!(point.encode().unwrap_err(), EncodingError::NoFields);
    }

    #[test]
    fn test_non_finite_channel_value_fails_encoding() {
        let channels = [ChannelReading::new("a0", f64::NAN)];
        let point = build_point(DEFAULT_SOURCE, &channels, &GpsFix::default(), 1);
        assert!(matches!(
            point.encode(),
            Err(EncodingError::NonFiniteValue { .. })
        ));
    }
}
