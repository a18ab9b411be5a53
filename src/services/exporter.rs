use std::io;

use crate::domain::profile::CandidateProfile;

const HEADER: [&str; 8] = [
    "name",
    "job_title",
    "company",
    "location",
    "confidence_score",
    "source",
    "profile_url",
    "snippet",
];

pub fn write_csv<W: io::Write>(writer: W, profiles: &[CandidateProfile]) -> Result<(), csv::Error> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    csv_writer.write_record(HEADER)?;

    for profile in profiles {
        let score = format!("{:.1}", profile.confidence_score);
        csv_writer.write_record([
            profile.name.as_str(),
            profile.job_title.as_str(),
            profile.company.as_str(),
            profile.location_hint.as_deref().unwrap_or(""),
            score.as_str(),
            profile.source_backend.as_str(),
            profile.profile_url.as_str(),
            profile.snippet.as_str(),
        ])?;
    }

    csv_writer.flush()?;
    Ok(())
}

pub fn to_csv_bytes(profiles: &[CandidateProfile]) -> Result<Vec<u8>, csv::Error> {
    let mut buffer = vec![];
    write_csv(&mut buffer, profiles)?;
    Ok(buffer)
}

/// `profiles_20240131_154500.csv`
pub fn export_file_name(now: chrono::DateTime<chrono::Utc>) -> String {
    format!("profiles_{}.csv", now.format("%Y%m%d_%H%M%S"))
}
