/// The 52 ARKit blendshape names in canonical channel order.
pub const ARKIT_NAMES: [&str; 52] = [
    "eyeBlinkLeft",
    "eyeLookDownLeft",
    "eyeLookInLeft",
    "eyeLookOutLeft",
    "eyeLookUpLeft",
    "eyeSquintLeft",
    "eyeWideLeft",
    "eyeBlinkRight",
    "eyeLookDownRight",
    "eyeLookInRight",
    "eyeLookOutRight",
    "eyeLookUpRight",
    "eyeSquintRight",
    "eyeWideRight",
    "jawForward",
    "jawLeft",
    "jawRight",
    "jawOpen",
    "mouthClose",
    "mouthFunnel",
    "mouthPucker",
    "mouthLeft",
    "mouthRight",
    "mouthSmileLeft",
    "mouthSmileRight",
    "mouthFrownLeft",
    "mouthFrownRight",
    "mouthDimpleLeft",
    "mouthDimpleRight",
    "mouthStretchLeft",
    "mouthStretchRight",
    "mouthRollLower",
    "mouthRollUpper",
    "mouthShrugLower",
    "mouthShrugUpper",
    "mouthPressLeft",
    "mouthPressRight",
    "mouthLowerDownLeft",
    "mouthLowerDownRight",
    "mouthUpperUpLeft",
    "mouthUpperUpRight",
    "browDownLeft",
    "browDownRight",
    "browInnerUp",
    "browOuterUpLeft",
    "browOuterUpRight",
    "cheekPuff",
    "cheekSquintLeft",
    "cheekSquintRight",
    "noseSneerLeft",
    "noseSneerRight",
    "tongueOut",
];

/// Channel names for an engine producing `count` weights per frame.
///
/// Channels past the ARKit set are named `a2f_extra_0`, `a2f_extra_1`, ….
pub fn blendshape_names(count: usize) -> Vec<String> {
    ARKIT_NAMES
        .iter()
        .map(|s| s.to_string())
        .chain((0..count.saturating_sub(ARKIT_NAMES.len())).map(|i| format!("a2f_extra_{i}")))
        .take(count)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_72() {
        let names = blendshape_names(72);
        assert_eq!(names.len(), 72);
        assert_eq!(names[0], "eyeBlinkLeft");
        assert_eq!(names[51], "tongueOut");
        assert_eq!(names[52], "a2f_extra_0");
        assert_eq!(names[71], "a2f_extra_19");
    }

    #[test]
    fn test_names_truncated() {
        let names = blendshape_names(10);
        assert_eq!(names.len(), 10);
        assert_eq!(names[9], "eyeLookInRight");
    }

    #[test]
    fn test_names_exact_arkit() {
        let names = blendshape_names(52);
        assert_eq!(names.last().map(String::as_str), Some("tongueOut"));
        assert!(blendshape_names(0).is_empty());
    }

    #[test]
    fn test_names_unique() {
        let mut names = blendshape_names(80);
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 80);
    }
}
