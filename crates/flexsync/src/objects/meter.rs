//! Meter definitions.
//!
//! FlexRadio assigns numeric meter IDs dynamically at runtime. Definitions
//! arrive as status lines in the `N.key=value#` form
//! (`meter 5.src=SLC#5.num=0#5.nam=LEVEL#5.unit=dBm#...`); values arrive
//! separately over the shared meter UDP stream and are decoded by
//! [`crate::meters::MeterDecoder`].

use flexsync_core::convert::{parse_f64, parse_u32};
use flexsync_core::{ObjectId, ObjectKind, Result};

use super::{RadioObject, status_tokens, update};
use crate::registry::{ObjectStore, Registry};
use crate::vita49::PayloadLayout;

/// Well-known meter name: slice signal level.
pub const METER_LEVEL: &str = "LEVEL";

/// Well-known meter name: forward TX power.
pub const METER_FORWARD_POWER: &str = "FWDPWR";

/// Well-known meter name: reflected TX power.
pub const METER_REFLECTED_POWER: &str = "REFPWR";

/// Well-known meter name: standing wave ratio.
pub const METER_SWR: &str = "SWR";

/// Well-known meter name: automatic level control.
pub const METER_ALC: &str = "ALC";

/// Well-known meter name: PA temperature.
pub const METER_PA_TEMP: &str = "PATEMP";

status_tokens! {
    pub enum MeterToken {
        Source => "src",
        SourceIndex => "num",
        Name => "nam",
        Low => "low",
        High => "hi",
        Description => "desc",
        Units => "unit",
        Fps => "fps",
    }
}

/// Unit a meter reports in, which decides how raw values are scaled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MeterUnit {
    Db,
    Dbm,
    Dbfs,
    Swr,
    Volts,
    Amps,
    DegC,
    DegF,
    Rpm,
    Watts,
    Percent,
    Other(String),
}

impl MeterUnit {
    pub fn parse(text: &str) -> Self {
        match text {
            "dB" => MeterUnit::Db,
            "dBm" => MeterUnit::Dbm,
            "dBFS" => MeterUnit::Dbfs,
            "SWR" => MeterUnit::Swr,
            "Volts" => MeterUnit::Volts,
            "Amps" => MeterUnit::Amps,
            "degC" => MeterUnit::DegC,
            "degF" => MeterUnit::DegF,
            "RPM" => MeterUnit::Rpm,
            "Watts" => MeterUnit::Watts,
            "Percent" => MeterUnit::Percent,
            other => MeterUnit::Other(other.to_string()),
        }
    }

    /// Convert a raw 16-bit meter value to this unit.
    ///
    /// dB-family and SWR values are fixed point with 7 fractional bits,
    /// temperatures with 6. Volts and amps use 8 fractional bits, or 10 on
    /// legacy firmware. Everything else is a plain count.
    pub fn scale(&self, raw: i16, layout: PayloadLayout) -> f32 {
        let raw = raw as f32;
        match self {
            MeterUnit::Db | MeterUnit::Dbm | MeterUnit::Dbfs | MeterUnit::Swr => raw / 128.0,
            MeterUnit::Volts | MeterUnit::Amps => match layout {
                PayloadLayout::Current => raw / 256.0,
                PayloadLayout::Legacy => raw / 1024.0,
            },
            MeterUnit::DegC | MeterUnit::DegF => raw / 64.0,
            _ => raw,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Meter {
    pub id: ObjectId,
    /// Owning subsystem, e.g. `SLC`, `TX-`, `RAD`.
    pub source: String,
    /// Instance within the source, e.g. the slice index.
    pub source_index: u32,
    pub name: String,
    pub low: f64,
    pub high: f64,
    pub description: String,
    /// Unit as spelled by the radio; empty until reported.
    pub units: String,
    pub fps: u32,
    /// Latest converted reading.
    pub value: f32,
}

impl Meter {
    pub fn unit(&self) -> MeterUnit {
        MeterUnit::parse(&self.units)
    }

    /// Store a new reading. Returns whether it differs from the last one.
    pub(crate) fn set_value(&mut self, value: f32) -> bool {
        update(&mut self.value, value)
    }
}

impl RadioObject for Meter {
    const KIND: ObjectKind = ObjectKind::Meter;
    type Token = MeterToken;

    fn new(id: ObjectId) -> Self {
        Meter {
            id,
            source: String::new(),
            source_index: 0,
            name: String::new(),
            low: 0.0,
            high: 0.0,
            description: String::new(),
            units: String::new(),
            fps: 0,
            value: 0.0,
        }
    }

    fn id(&self) -> &ObjectId {
        &self.id
    }

    fn apply(&mut self, token: MeterToken, value: &str) -> Result<bool> {
        use MeterToken::*;
        Ok(match token {
            Source => update(&mut self.source, value.to_string()),
            SourceIndex => update(&mut self.source_index, parse_u32(value)?),
            Name => update(&mut self.name, value.to_string()),
            Low => update(&mut self.low, parse_f64(value)?),
            High => update(&mut self.high, parse_f64(value)?),
            Description => update(&mut self.description, value.to_string()),
            Units => update(&mut self.units, value.to_string()),
            Fps => update(&mut self.fps, parse_u32(value)?),
        })
    }

    fn is_ready(&self) -> bool {
        !self.source.is_empty() && !self.units.is_empty()
    }

    fn command_prefix(_id: &ObjectId) -> Option<String> {
        None
    }

    fn store(registry: &Registry) -> &ObjectStore<Self> {
        registry.meters()
    }
}

/// Find a meter id by source and name, e.g. `("TX-", "FWDPWR")`.
pub fn find_meter(store: &ObjectStore<Meter>, source: &str, name: &str) -> Option<u32> {
    store.ids().into_iter().find_map(|id| {
        let entry = store.get(&id)?;
        let meter = entry.read();
        (meter.source == source && meter.name == name)
            .then(|| id.as_u32())
            .flatten()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::broadcast;

    #[test]
    fn unit_parsing() {
        assert_eq!(MeterUnit::parse("dBm"), MeterUnit::Dbm);
        assert_eq!(MeterUnit::parse("Volts"), MeterUnit::Volts);
        assert_eq!(MeterUnit::parse("furlongs"), MeterUnit::Other("furlongs".into()));
    }

    #[test]
    fn scaling() {
        assert_eq!(MeterUnit::Volts.scale(2560, PayloadLayout::Current), 10.0);
        assert_eq!(MeterUnit::Volts.scale(2560, PayloadLayout::Legacy), 2.5);
        assert_eq!(MeterUnit::Dbm.scale(-128 * 73, PayloadLayout::Current), -73.0);
        assert_eq!(MeterUnit::DegC.scale(64 * 45, PayloadLayout::Current), 45.0);
        assert_eq!(MeterUnit::Rpm.scale(1200, PayloadLayout::Current), 1200.0);
    }

    #[test]
    fn ready_with_source_and_units() {
        let mut m = Meter::new(ObjectId::Index(5));
        m.apply(MeterToken::Name, "LEVEL").unwrap();
        assert!(!m.is_ready());
        m.apply(MeterToken::Source, "SLC").unwrap();
        m.apply(MeterToken::Units, "dBm").unwrap();
        assert!(m.is_ready());
        assert_eq!(m.unit(), MeterUnit::Dbm);
    }

    #[test]
    fn read_only_kind() {
        assert_eq!(
            Meter::set_command(&ObjectId::Index(1), MeterToken::Low, "0"),
            None
        );
    }

    #[test]
    fn lookup_by_source_and_name() {
        let (tx, _rx) = broadcast::channel(8);
        let store = ObjectStore::<Meter>::new(tx);
        let fields = |src: &str, nam: &str| {
            vec![
                ("src".to_string(), src.to_string()),
                ("nam".to_string(), nam.to_string()),
            ]
        };
        store.apply_status(&ObjectId::Index(3), &fields("SLC", METER_LEVEL));
        store.apply_status(&ObjectId::Index(9), &fields("TX-", METER_FORWARD_POWER));
        assert_eq!(find_meter(&store, "TX-", METER_FORWARD_POWER), Some(9));
        assert_eq!(find_meter(&store, "SLC", METER_SWR), None);
    }
}
