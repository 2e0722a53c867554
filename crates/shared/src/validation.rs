//! Common validation utilities.

use validator::ValidationError;

/// Image subtypes accepted for listing images.
pub const ALLOWED_IMAGE_TYPES: [&str; 7] = ["jpg", "jpeg", "png", "gif", "bmp", "webp", "svg"];

/// Largest search radius accepted, in kilometers.
pub const MAX_SEARCH_RADIUS_KM: f64 = 20_037.5;

/// Validates that a latitude value is within valid range (-90 to 90).
pub fn validate_latitude(lat: f64) -> Result<(), ValidationError> {
    if (-90.0..=90.0).contains(&lat) {
        Ok(())
    } else {
        let mut err = ValidationError::new("latitude_range");
        err.message = Some("Latitude must be between -90 and 90".into());
        Err(err)
    }
}

/// Validates that a longitude value is within valid range (-180 to 180).
pub fn validate_longitude(lon: f64) -> Result<(), ValidationError> {
    if (-180.0..=180.0).contains(&lon) {
        Ok(())
    } else {
        let mut err = ValidationError::new("longitude_range");
        err.message = Some("Longitude must be between -180 and 180".into());
        Err(err)
    }
}

/// Validates a search radius in kilometers.
pub fn validate_radius_km(radius: f64) -> Result<(), ValidationError> {
    if radius.is_finite() && (0.0..=MAX_SEARCH_RADIUS_KM).contains(&radius) {
        Ok(())
    } else {
        let mut err = ValidationError::new("radius_range");
        err.message = Some("Radius must be between 0 and 20037.5 km".into());
        Err(err)
    }
}

/// Returns true when the declared content type names an allowed image subtype.
///
/// Matching is by substring so that both `image/png` and a bare `png` pass.
pub fn is_allowed_image_type(content_type: &str) -> bool {
    let content_type = content_type.trim().to_ascii_lowercase();
    !content_type.is_empty()
        && ALLOWED_IMAGE_TYPES
            .iter()
            .any(|allowed| content_type.contains(allowed))
}
