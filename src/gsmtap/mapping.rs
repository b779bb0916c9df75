//! Mapping of trace format codes to GSMTAP types and subtypes.
use super::{GsmtapSubtype, GsmtapType};
use crate::trace::{TraceFormat, TraceInfo};
use arbitrary_int::{prelude::*, u4};

/// GSMTAP type and subtype resulting from a trace format code.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ChannelMapping {
    pub is_burst_type: bool,
    pub subtype: GsmtapSubtype,
}

impl ChannelMapping {
    #[inline]
    pub const fn gsmtap_type(&self) -> GsmtapType {
        if self.is_burst_type {
            GsmtapType::UmBurst
        } else {
            GsmtapType::Um
        }
    }
}

impl From<Option<TraceFormat>> for ChannelMapping {
    fn from(format: Option<TraceFormat>) -> Self {
        let subtype = match format {
            Some(TraceFormat::NormalBurst) => GsmtapSubtype::NormalBurst,
            Some(TraceFormat::Rach) => GsmtapSubtype::Rach,
            Some(TraceFormat::AccessBurst) => GsmtapSubtype::AccessBurst,
            Some(TraceFormat::Bcch) => GsmtapSubtype::Bcch,
            Some(TraceFormat::Pch) => GsmtapSubtype::Pch,
            // GSMTAP has no dedicated CBCH subtype.
            Some(TraceFormat::Cbch) => GsmtapSubtype::Sdcch,
            Some(TraceFormat::Sdcch) => GsmtapSubtype::Sdcch,
            Some(TraceFormat::SacchSdcch) => GsmtapSubtype::AcchSdcch,
            Some(TraceFormat::TchF) => GsmtapSubtype::TchF,
            Some(TraceFormat::TchH) => GsmtapSubtype::TchH,
            Some(TraceFormat::Ccch) => GsmtapSubtype::Ccch,
            Some(TraceFormat::Agch) => GsmtapSubtype::Agch,
            None => GsmtapSubtype::Unknown,
        };
        Self {
            is_burst_type: subtype.is_burst(),
            subtype,
        }
    }
}

/// Map a 4-bit trace format code to its GSMTAP type and subtype.
pub fn map(format_code: u4) -> ChannelMapping {
    ChannelMapping::from(TraceFormat::try_from(format_code.as_u8()).ok())
}

/// Map the format code contained in the `info` byte of a trace header.
#[inline]
pub fn map_info(info: TraceInfo) -> ChannelMapping {
    map(info.format_code())
}
