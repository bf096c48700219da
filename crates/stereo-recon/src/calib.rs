use stereo_image::ImageSize;

/// Errors raised when parsing calibration text.
#[derive(thiserror::Error, Debug)]
pub enum CalibrationError {
    /// A camera line does not contain a bracketed matrix.
    #[error("Cannot parse calibration line: {0:?}")]
    UnparsableLine(String),

    /// A bracketed matrix does not hold exactly 9 numeric values.
    #[error("Expected 9 values in camera matrix, got {0}")]
    WrongValueCount(usize),

    /// A matrix entry is not a valid number.
    #[error("Invalid numeric value in camera matrix: {0:?}")]
    InvalidNumber(String),

    /// Fewer than two camera matrices were found.
    #[error("Calibration file must contain at least two camera matrices.")]
    MissingCamera,
}

/// Parse Middlebury-format calibration text into two intrinsic matrices.
///
/// Expected format (first two lines):
///
/// ```text
/// cam0=[f 0 cx; 0 f cy; 0 0 1]
/// cam1=[f 0 cx; 0 f cy; 0 0 1]
/// ```
///
/// The nine space/semicolon-separated values inside each bracket are
/// reshaped row-major into a 3x3 matrix. Trailing lines (`doffs`,
/// `baseline`, ...) are ignored.
pub fn parse_calibration(
    content: &str,
) -> Result<([[f64; 3]; 3], [[f64; 3]; 3]), CalibrationError> {
    let mut matrices = Vec::with_capacity(2);

    for line in content.trim().lines().take(2) {
        let start = line
            .find('[')
            .ok_or_else(|| CalibrationError::UnparsableLine(line.to_string()))?;
        let end = line
            .rfind(']')
            .filter(|&end| end > start)
            .ok_or_else(|| CalibrationError::UnparsableLine(line.to_string()))?;

        let inner = line[start + 1..end].replace(';', " ");
        let values = inner
            .split_whitespace()
            .map(|tok| {
                tok.parse::<f64>()
                    .map_err(|_| CalibrationError::InvalidNumber(tok.to_string()))
            })
            .collect::<Result<Vec<f64>, _>>()?;

        if values.len() != 9 {
            return Err(CalibrationError::WrongValueCount(values.len()));
        }

        let mut k = [[0.0; 3]; 3];
        for (i, v) in values.iter().enumerate() {
            k[i / 3][i % 3] = *v;
        }
        matrices.push(k);
    }

    if matrices.len() < 2 {
        return Err(CalibrationError::MissingCamera);
    }
    Ok((matrices[0], matrices[1]))
}

/// Estimate a plausible intrinsic matrix from image dimensions.
///
/// Uses the heuristic that the focal length is max(width, height) and the
/// principal point sits at the image center. A fallback for when no
/// calibration file is provided.
pub fn estimate_intrinsics(size: ImageSize) -> [[f64; 3]; 3] {
    let f = size.width.max(size.height) as f64;
    let cx = size.width as f64 / 2.0;
    let cy = size.height as f64 / 2.0;
    [[f, 0.0, cx], [0.0, f, cy], [0.0, 0.0, 1.0]]
}
