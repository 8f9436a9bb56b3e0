//! The flat parameter set consumed by the pipeline.
//!
//! Every stage parameter is one of: bool, ranged int, ranged float, or a
//! closed mode enum. The surface is meant to always be "safe" no matter
//! where values come from: out-of-range numbers are clamped to their
//! declared domain (never rejected), unknown keys and kind mismatches
//! are rejected, and an unrecognized enum label falls back to the
//! stage's off mode.
//!
//! Mode selections are real enums rather than strings so that stage
//! dispatch is exhaustive at compile time; [`Params::schema`] exposes
//! the string labels for interactive-control integrations.

use serde::{Deserialize, Serialize};

/// Declare a closed mode enum whose first variant `None` disables the
/// stage. Generates label parsing for the schema surface.
macro_rules! mode_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $label:literal),* $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            /// Stage disabled.
            #[default]
            None,
            $(
                #[doc = $label]
                $variant,
            )*
        }

        impl $name {
            /// The closed set of accepted labels, `"None"` first.
            pub const LABELS: &'static [&'static str] = &["None", $($label),*];

            /// The label for this mode.
            #[must_use]
            pub const fn label(self) -> &'static str {
                match self {
                    Self::None => "None",
                    $(Self::$variant => $label,)*
                }
            }

            /// Parse a label from the closed set.
            #[must_use]
            pub fn from_label(label: &str) -> Option<Self> {
                match label {
                    "None" => Some(Self::None),
                    $($label => Some(Self::$variant),)*
                    _ => None,
                }
            }

            /// Whether the stage is enabled.
            #[must_use]
            pub const fn is_enabled(self) -> bool {
                !matches!(self, Self::None)
            }
        }
    };
}

mode_enum! {
    /// Geometric composition applied before everything else.
    SplitMode {
        VerticalSplit => "Vertical Split",
        HorizontalSplit => "Horizontal Split",
        QuadMirror => "Quad Mirror",
        RadialMirror => "Radial Mirror",
        RecursiveGrid => "Recursive Grid",
        TimeShiftedSplit => "Time-Shifted Split",
        RgbChannelSplit => "RGB Channel Split",
        InfiniteTunnel => "Infinite Tunnel",
        CheckerboardMirror => "Checkerboard Mirror",
        KaleidoscopeEightWay => "Kaleidoscope 8-way",
        ScanlineInterlace => "Scanline Interlace",
        GlitchGrid => "Glitch Grid",
        VerticalSlitScan => "Vertical Slit Scan",
        HorizontalSlitScan => "Horizontal Slit Scan",
    }
}

mode_enum! {
    /// Edge/outline extraction.
    EdgeMode {
        Canny => "Canny",
        Sobel => "Sobel",
        Neon => "Neon",
        ComicInk => "Comic Ink",
    }
}

mode_enum! {
    /// Hand-drawn sketch looks.
    SketchMode {
        Pencil => "Pencil",
        Charcoal => "Charcoal",
    }
}

mode_enum! {
    /// Halftone reproduction.
    HalftoneMode {
        Dots => "Dots",
    }
}

mode_enum! {
    /// Block-geometric restylings.
    GeometryMode {
        Mosaic => "Mosaic",
        Ascii => "ASCII",
    }
}

mode_enum! {
    /// Painterly texture smoothing.
    TextureMode {
        Canvas => "Canvas",
        Watercolor => "Watercolor",
        Oil => "Oil",
    }
}

mode_enum! {
    /// Color grading looks.
    LookMode {
        Sepia => "Sepia",
        Cyberpunk => "Cyberpunk",
        Duotone => "Duotone",
    }
}

mode_enum! {
    /// Optical distortions.
    OpticalMode {
        Kaleidoscope => "Kaleidoscope",
        Swirl => "Swirl",
        MirrorTiles => "Mirror Tiles",
    }
}

mode_enum! {
    /// Simulated dead sensor channel.
    DeadChannel {
        Red => "Red",
        Green => "Green",
        Blue => "Blue",
    }
}

/// A dynamically typed parameter value, as delivered by an external
/// control surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    /// Toggle.
    Bool(bool),
    /// Integer within a declared range.
    Int(i64),
    /// Float within a declared range.
    Float(f32),
    /// Label from a closed enum set.
    Enum(String),
}

impl ParamValue {
    /// Human-readable kind name for error messages.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Enum(_) => "enum",
        }
    }
}

/// The declared domain of one parameter.
///
/// Schema types are an output-only surface; they serialize for control
/// integrations but are never read back.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ParamKind {
    /// Boolean toggle.
    Bool,
    /// Integer with inclusive bounds.
    Int {
        /// Lower bound.
        min: i32,
        /// Upper bound.
        max: i32,
    },
    /// Float with inclusive bounds.
    Float {
        /// Lower bound.
        min: f32,
        /// Upper bound.
        max: f32,
    },
    /// Closed label set.
    Enum {
        /// Accepted labels, off-value first.
        variants: &'static [&'static str],
    },
}

/// Schema entry for one parameter: name, domain, and default.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParamSpec {
    /// The flat key used by [`Params::set`].
    pub name: &'static str,
    /// Declared domain.
    pub kind: ParamKind,
    /// Value in a freshly constructed [`Params`].
    pub default: ParamValue,
}

/// Errors from [`Params::set`].
///
/// Out-of-range values never error — they are clamped. Only structural
/// problems (a key the schema does not declare, or a value of the wrong
/// kind) are rejected.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ParamError {
    /// The key is not declared in the schema.
    #[error("unknown parameter {0:?}")]
    UnknownKey(String),
    /// The value's kind does not match the declared kind.
    #[error("parameter {name:?} expects {expected}, got {got}")]
    KindMismatch {
        /// Parameter name.
        name: String,
        /// Declared kind.
        expected: &'static str,
        /// Supplied kind.
        got: &'static str,
    },
}

/// Declare the full parameter struct plus its schema and keyed accessors
/// in one place so the three can never drift apart.
macro_rules! declare_params {
    (
        bools { $($bname:ident = $bdef:expr;)* }
        ints { $($iname:ident : $imin:expr, $imax:expr, $idef:expr;)* }
        floats { $($fname:ident : $fmin:expr, $fmax:expr, $fdef:expr;)* }
        modes { $($mname:ident : $mty:ident;)* }
    ) => {
        /// The complete flat parameter set, read-only to the pipeline.
        ///
        /// Field order groups parameters by stage group; see
        /// [`Params::schema`] for the declared domains.
        #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
        #[serde(default)]
        #[allow(clippy::struct_excessive_bools)]
        pub struct Params {
            $(
                #[doc = concat!("`", stringify!($bname), "` toggle.")]
                pub $bname: bool,
            )*
            $(
                #[doc = concat!("`", stringify!($iname), "` amount.")]
                pub $iname: i32,
            )*
            $(
                #[doc = concat!("`", stringify!($fname), "` amount.")]
                pub $fname: f32,
            )*
            $(
                #[doc = concat!("`", stringify!($mname), "` selection.")]
                pub $mname: $mty,
            )*
        }

        impl Default for Params {
            fn default() -> Self {
                Self {
                    $($bname: $bdef,)*
                    $($iname: $idef,)*
                    $($fname: $fdef,)*
                    $($mname: $mty::None,)*
                }
            }
        }

        impl Params {
            /// Enumerate every parameter's name, domain, and default.
            #[must_use]
            pub fn schema() -> Vec<ParamSpec> {
                vec![
                    $(ParamSpec {
                        name: stringify!($bname),
                        kind: ParamKind::Bool,
                        default: ParamValue::Bool($bdef),
                    },)*
                    $(ParamSpec {
                        name: stringify!($iname),
                        kind: ParamKind::Int { min: $imin, max: $imax },
                        default: ParamValue::Int(i64::from($idef)),
                    },)*
                    $(ParamSpec {
                        name: stringify!($fname),
                        kind: ParamKind::Float { min: $fmin, max: $fmax },
                        default: ParamValue::Float($fdef),
                    },)*
                    $(ParamSpec {
                        name: stringify!($mname),
                        kind: ParamKind::Enum { variants: $mty::LABELS },
                        default: ParamValue::Enum(String::from("None")),
                    },)*
                ]
            }

            /// Set one parameter by its flat key.
            ///
            /// Numeric values outside the declared range are clamped to
            /// the nearest bound; an unrecognized enum label falls back
            /// to the stage's off mode.
            ///
            /// # Errors
            ///
            /// [`ParamError::UnknownKey`] for an undeclared key,
            /// [`ParamError::KindMismatch`] when the value kind does not
            /// match the declaration (ints and floats coerce freely).
            #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
            pub fn set(&mut self, name: &str, value: &ParamValue) -> Result<(), ParamError> {
                match name {
                    $(stringify!($bname) => match value {
                        ParamValue::Bool(v) => {
                            self.$bname = *v;
                            Ok(())
                        }
                        other => Err(ParamError::KindMismatch {
                            name: name.to_owned(),
                            expected: "bool",
                            got: other.kind_name(),
                        }),
                    },)*
                    $(stringify!($iname) => match value {
                        ParamValue::Int(v) => {
                            self.$iname = (*v).clamp(i64::from($imin), i64::from($imax)) as i32;
                            Ok(())
                        }
                        ParamValue::Float(v) => {
                            let v = if v.is_finite() { v.round() as i64 } else { i64::from($idef) };
                            self.$iname = v.clamp(i64::from($imin), i64::from($imax)) as i32;
                            Ok(())
                        }
                        other => Err(ParamError::KindMismatch {
                            name: name.to_owned(),
                            expected: "int",
                            got: other.kind_name(),
                        }),
                    },)*
                    $(stringify!($fname) => match value {
                        ParamValue::Float(v) => {
                            let v = if v.is_finite() { *v } else { $fdef };
                            self.$fname = v.clamp($fmin, $fmax);
                            Ok(())
                        }
                        ParamValue::Int(v) => {
                            self.$fname = (*v as f32).clamp($fmin, $fmax);
                            Ok(())
                        }
                        other => Err(ParamError::KindMismatch {
                            name: name.to_owned(),
                            expected: "float",
                            got: other.kind_name(),
                        }),
                    },)*
                    $(stringify!($mname) => match value {
                        ParamValue::Enum(label) => {
                            self.$mname = $mty::from_label(label).unwrap_or($mty::None);
                            Ok(())
                        }
                        other => Err(ParamError::KindMismatch {
                            name: name.to_owned(),
                            expected: "enum",
                            got: other.kind_name(),
                        }),
                    },)*
                    _ => Err(ParamError::UnknownKey(name.to_owned())),
                }
            }

            /// Clamp every numeric field to its declared range in place.
            ///
            /// Useful after deserializing a parameter set from an
            /// untrusted source.
            pub fn clamp(&mut self) {
                $(
                    self.$iname = self.$iname.clamp($imin, $imax);
                )*
                $(
                    self.$fname = if self.$fname.is_finite() {
                        self.$fname.clamp($fmin, $fmax)
                    } else {
                        $fdef
                    };
                )*
            }
        }
    };
}

declare_params! {
    bools {
        invert = false;
    }
    ints {
        // Basic adjustments.
        color_depth: 1, 8, 8;
        blur: 0, 25, 0;
        pixelate: 1, 64, 1;
        // Edge/outline.
        edge_thresh: 1, 255, 100;
        // Glitch.
        glitch_rgb_split: 0, 50, 0;
        glitch_jitter: 0, 50, 0;
        glitch_block_shift: 0, 100, 0;
        vhs_noise: 0, 100, 0;
        // Optical.
        optical_amount: 0, 100, 0;
        // Color looks / light.
        film_grain: 0, 50, 0;
        vignette: 0, 100, 0;
        bloom: 0, 100, 0;
        // Temporal.
        motion_trail: 0, 60, 0;
        ghosting: 0, 100, 0;
        time_smear: 0, 100, 0;
        temporal_echo: 0, 30, 0;
        time_slice: 0, 100, 0;
        reverse_aging: 0, 100, 0;
        freeze_cells: 0, 100, 0;
        memory_burn: 0, 100, 0;
        temp_feedback: 0, 100, 0;
        time_jitter: 0, 60, 0;
        slit_scan: 0, 100, 0;
        temp_quantize: 0, 60, 0;
        // Destructive color.
        color_collapse: 0, 100, 0;
        hue_shatter: 0, 30, 0;
        bit_rot: 0, 100, 0;
        palette_decay: 0, 100, 0;
        solarize_hell: 0, 100, 0;
        color_bleeding: 0, 100, 0;
        chromatic_meltdown: 0, 30, 0;
        hue_feedback: 0, 30, 0;
        // Digital violence.
        comp_artifacts: 0, 99, 0;
        row_desync: 0, 100, 0;
        packet_loss: 0, 50, 0;
        res_thrashing: 0, 100, 0;
        macroblock_shuffle: 0, 100, 0;
        sync_loss: 0, 100, 0;
        datamosh_still: 0, 100, 0;
        buffer_overrun: 0, 100, 0;
        corrupted_header: 0, 100, 0;
        // Spatial chaos.
        pixel_gravity: 0, 10, 0;
        reality_tear: 0, 20, 0;
        recursive_zoom: 0, 100, 0;
        voronoi_dest: 0, 200, 0;
        non_euclidean: 0, 50, 0;
        pixel_erosion: 0, 10, 0;
        fracture_glass: 0, 20, 0;
        spatial_feedback: 0, 100, 0;
        folding_space: 0, 5, 0;
        // Perception.
        motion_hallucination: 0, 100, 0;
        impossible_colors: 0, 100, 0;
        edge_overload: 0, 5, 0;
        depth_inversion: 0, 100, 0;
        face_ghosting: 0, 100, 0;
        pareidolia_booster: 0, 100, 0;
        visual_tinnitus: 0, 100, 0;
        afterimage_trap: 0, 100, 0;
        // Temporal + spatial hybrids.
        time_delayed_mirrors: 0, 100, 0;
        motion_fossils: 0, 100, 0;
        temp_blur_field: 0, 100, 0;
        chrono_pixel_sort: 0, 100, 0;
        frame_erosion: 0, 100, 0;
        event_horizon: 0, 100, 0;
        time_warp_vortex: 0, 30, 0;
        // Minimalism / conceptual.
        single_pixel: 0, 100, 0;
        average_reality: 0, 100, 0;
        color_census: 0, 100, 0;
        entropy_maximizer: 0, 100, 0;
        camera_amnesia: 0, 60, 0;
        reality_quantizer: 0, 100, 0;
        noise_wins: 0, 100, 0;
        // Performance art.
        surveillance_degradation: 0, 100, 0;
        attention_punisher: 0, 100, 0;
        observer_effect: 0, 100, 0;
        machine_fatigue: 0, 100, 0;
        digital_death: 0, 100, 0;
        resurrection_loop: 0, 100, 0;
        // Boost (CPU renditions of the GPU-tier effects).
        boost_blur: 0, 25, 0;
        boost_canny: 0, 100, 0;
        boost_bilateral: 0, 100, 0;
        boost_warp: 0, 100, 0;
        boost_punch: 0, 100, 0;
        boost_edge_glow: 0, 100, 0;
        boost_dream: 0, 100, 0;
        boost_posterize: 0, 100, 0;
        boost_chromatic: 0, 100, 0;
        boost_solarize: 0, 100, 0;
        boost_ghosting: 0, 100, 0;
        boost_color_cycle: 0, 100, 0;
        boost_block_glitch: 0, 100, 0;
        boost_radial_blur: 0, 100, 0;
        boost_infrared: 0, 100, 0;
    }
    floats {
        contrast: 0.1, 3.0, 1.0;
        saturation: 0.0, 3.0, 1.0;
        average: 0.0, 1.0, 0.0;
    }
    modes {
        split_mode: SplitMode;
        edge_mode: EdgeMode;
        sketch_mode: SketchMode;
        halftone_mode: HalftoneMode;
        geometry_mode: GeometryMode;
        texture_mode: TextureMode;
        look_mode: LookMode;
        optical_mode: OpticalMode;
        dead_channel: DeadChannel;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_all_off() {
        let params = Params::default();
        for spec in Params::schema() {
            match (&spec.kind, &spec.default) {
                (ParamKind::Bool, ParamValue::Bool(v)) => {
                    assert!(!v, "{} defaults on", spec.name);
                }
                (ParamKind::Enum { .. }, ParamValue::Enum(label)) => {
                    assert_eq!(label, "None", "{} defaults enabled", spec.name);
                }
                _ => {}
            }
        }
        assert!(!params.invert);
        assert_eq!(params.split_mode, SplitMode::None);
        assert_eq!(params.motion_trail, 0);
        assert!((params.contrast - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn schema_covers_every_key() {
        let mut params = Params::default();
        for spec in Params::schema() {
            // Every declared key must round-trip through `set` with its
            // own default value.
            params.set(spec.name, &spec.default).unwrap();
        }
        assert_eq!(params, Params::default());
    }

    #[test]
    fn schema_serializes_to_json() {
        let json = serde_json::to_string(&Params::schema()).unwrap();
        assert!(json.contains("motion_trail"));
        assert!(json.contains("Quad Mirror"));
    }

    #[test]
    fn unknown_key_is_rejected() {
        let mut params = Params::default();
        let err = params.set("warp_factor", &ParamValue::Int(9)).unwrap_err();
        assert_eq!(err, ParamError::UnknownKey("warp_factor".to_owned()));
    }

    #[test]
    fn out_of_range_int_is_clamped_not_rejected() {
        let mut params = Params::default();
        params.set("motion_trail", &ParamValue::Int(9999)).unwrap();
        assert_eq!(params.motion_trail, 60);
        params.set("motion_trail", &ParamValue::Int(-5)).unwrap();
        assert_eq!(params.motion_trail, 0);
    }

    #[test]
    fn out_of_range_float_is_clamped() {
        let mut params = Params::default();
        params.set("contrast", &ParamValue::Float(99.0)).unwrap();
        assert!((params.contrast - 3.0).abs() < f32::EPSILON);
        params.set("contrast", &ParamValue::Float(-1.0)).unwrap();
        assert!((params.contrast - 0.1).abs() < f32::EPSILON);
    }

    #[test]
    fn nan_float_falls_back_to_default() {
        let mut params = Params::default();
        params.set("contrast", &ParamValue::Float(f32::NAN)).unwrap();
        assert!((params.contrast - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn int_and_float_coerce() {
        let mut params = Params::default();
        params.set("blur", &ParamValue::Float(3.6)).unwrap();
        assert_eq!(params.blur, 4);
        params.set("contrast", &ParamValue::Int(2)).unwrap();
        assert!((params.contrast - 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn kind_mismatch_is_rejected() {
        let mut params = Params::default();
        let err = params.set("invert", &ParamValue::Int(1)).unwrap_err();
        assert!(matches!(err, ParamError::KindMismatch { .. }));
    }

    #[test]
    fn enum_label_round_trip() {
        let mut params = Params::default();
        params
            .set("edge_mode", &ParamValue::Enum("Comic Ink".to_owned()))
            .unwrap();
        assert_eq!(params.edge_mode, EdgeMode::ComicInk);
    }

    #[test]
    fn unknown_enum_label_falls_back_to_off() {
        let mut params = Params::default();
        params.edge_mode = EdgeMode::Canny;
        params
            .set("edge_mode", &ParamValue::Enum("Chalk".to_owned()))
            .unwrap();
        assert_eq!(params.edge_mode, EdgeMode::None);
    }

    #[test]
    fn clamp_repairs_out_of_range_fields() {
        let mut params = Params::default();
        params.motion_trail = 500;
        params.pixelate = 0;
        params.saturation = -2.0;
        params.clamp();
        assert_eq!(params.motion_trail, 60);
        assert_eq!(params.pixelate, 1);
        assert!((params.saturation - 0.0).abs() < f32::EPSILON);
    }

    #[test]
    fn mode_labels_parse_and_print() {
        assert_eq!(SplitMode::from_label("Quad Mirror"), Some(SplitMode::QuadMirror));
        assert_eq!(SplitMode::QuadMirror.label(), "Quad Mirror");
        assert_eq!(SplitMode::from_label("Nope"), None);
        assert!(SplitMode::LABELS.contains(&"Vertical Slit Scan"));
        assert!(!SplitMode::None.is_enabled());
        assert!(OpticalMode::Swirl.is_enabled());
    }

    #[test]
    fn params_serde_round_trip() {
        let mut params = Params::default();
        params.motion_trail = 12;
        params.look_mode = LookMode::Sepia;
        params.invert = true;
        let json = serde_json::to_string(&params).unwrap();
        let back: Params = serde_json::from_str(&json).unwrap();
        assert_eq!(params, back);
    }

    #[test]
    fn params_deserialize_fills_missing_fields_with_defaults() {
        let back: Params = serde_json::from_str(r#"{"motion_trail": 7}"#).unwrap();
        assert_eq!(back.motion_trail, 7);
        assert_eq!(back.edge_mode, EdgeMode::None);
    }
}
