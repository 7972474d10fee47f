//! Static database of supported models.
//!
//! The info record tells us a device's motor type, range and pulse count, but not
//! its slot layout or aperture limits. Those live here, keyed by motor type id.

use super::DeviceKind;

/// Metadata for one motor type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceDescriptor {
    /// Motor type id reported in the info record.
    pub motor_type: u8,
    /// Model name.
    pub name: &'static str,
    /// Short description.
    pub description: &'static str,
    /// Kind this model is normally driven as.
    pub kind: DeviceKind,
    /// Ordered raw positions of the discrete slots.
    pub positions: Option<&'static [i32]>,
    /// Aperture bounds `(min, max)` in millimeters.
    pub aperture: Option<(f64, f64)>,
}

static DEVICES: &[DeviceDescriptor] = &[
    DeviceDescriptor {
        motor_type: 6,
        name: "ELL6",
        description: "Dual-Position Slider",
        kind: DeviceKind::Shutter,
        positions: Some(&[0, 31]),
        aperture: None,
    },
    DeviceDescriptor {
        motor_type: 9,
        name: "ELL9",
        description: "Four-Position Slider",
        kind: DeviceKind::Slider,
        positions: Some(&[0, 32, 64, 96]),
        aperture: None,
    },
    DeviceDescriptor {
        motor_type: 14,
        name: "ELL14",
        description: "Rotation Mount",
        kind: DeviceKind::Rotator,
        positions: None,
        aperture: None,
    },
    DeviceDescriptor {
        motor_type: 15,
        name: "ELL15",
        description: "Motorized Iris",
        kind: DeviceKind::Iris,
        positions: None,
        // Assumed bounds: 1 mm to 25 mm clear aperture
        aperture: Some((1.0, 25.0)),
    },
    DeviceDescriptor {
        // Assumed entry: continuous stage with no auxiliary metadata
        motor_type: 17,
        name: "ELL17",
        description: "Linear Stage",
        kind: DeviceKind::Linear,
        positions: None,
        aperture: None,
    },
    DeviceDescriptor {
        motor_type: 18,
        name: "ELL18",
        description: "Rotation Stage",
        kind: DeviceKind::Rotator,
        positions: None,
        aperture: None,
    },
    DeviceDescriptor {
        motor_type: 20,
        name: "ELL20",
        description: "Linear Stage",
        kind: DeviceKind::Linear,
        positions: None,
        aperture: None,
    },
];

/// Metadata for a motor type, or `None` for models without registry data.
pub fn lookup(motor_type: u8) -> Option<&'static DeviceDescriptor> {
    DEVICES.iter().find(|d| d.motor_type == motor_type)
}

/// Every registered model.
pub fn all() -> &'static [DeviceDescriptor] {
    DEVICES
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slider_positions() {
        let ell9 = lookup(9).unwrap();
        assert_eq!(ell9.positions, Some(&[0, 32, 64, 96][..]));
        assert_eq!(ell9.kind, DeviceKind::Slider);
        assert_eq!(lookup(6).unwrap().positions.unwrap().len(), 2);
    }

    #[test]
    fn test_iris_bounds() {
        let (min, max) = lookup(15).unwrap().aperture.unwrap();
        assert!(min < max);
    }

    #[test]
    fn test_assumed_entries() {
        let ell15 = lookup(15).unwrap();
        assert_eq!(ell15.aperture, Some((1.0, 25.0)));
        assert_eq!(ell15.positions, None);

        let ell17 = lookup(17).unwrap();
        assert_eq!(ell17.kind, DeviceKind::Linear);
        assert_eq!(ell17.positions, None);
        assert_eq!(ell17.aperture, None);
    }

    #[test]
    fn test_unknown_motor_type() {
        assert!(lookup(99).is_none());
    }

    #[test]
    fn test_ids_unique() {
        let mut ids: Vec<u8> = all().iter().map(|d| d.motor_type).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), all().len());
    }
}
