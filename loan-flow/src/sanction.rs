//! Provisional sanction letters.

use async_trait::async_trait;
use chrono::{Local, NaiveDate};
use printpdf::{BuiltinFont, Mm, PdfDocument};
use std::{
    fs::File,
    io::BufWriter,
    path::{Path, PathBuf},
};
use tracing::info;

use crate::{
    customer::Customer,
    error::{FlowError, Result},
    tasks::types::KycDetails,
};

/// Everything a sanction letter shows.
#[derive(Debug, Clone, PartialEq)]
pub struct SanctionRequest {
    pub customer: Customer,
    pub kyc: KycDetails,
    pub loan_amount: f64,
    pub tenure_months: u32,
    pub emi: f64,
}

/// Renders a sanction letter and returns where it was written.
#[async_trait]
pub trait SanctionGenerator: Send + Sync {
    async fn generate(&self, request: &SanctionRequest) -> Result<PathBuf>;
}

const TITLE: &str = "LOAN SANCTION LETTER";
const TERMS: &str = "This is a provisional sanction letter subject to final verification of \
documents and bank terms & conditions. Processing fees, applicable taxes and final interest \
rates will be shown in the formal sanction pack.";
const WRAP_WIDTH: usize = 90;

/// Writes one-page PDF letters into a directory.
pub struct PdfSanctionWriter {
    dir: PathBuf,
}

impl PdfSanctionWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn file_name(customer_id: &str, unix_ts: i64) -> String {
        format!("sanction_{customer_id}_{unix_ts}.pdf")
    }

    fn render(path: &Path, lines: &[Line]) -> Result<()> {
        let (doc, page, layer) = PdfDocument::new(TITLE, Mm(210.0), Mm(297.0), "letter");
        let regular = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| FlowError::Sanction(e.to_string()))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| FlowError::Sanction(e.to_string()))?;
        let layer = doc.get_page(page).get_layer(layer);

        let mut y = 275.0;
        for line in lines {
            match line {
                Line::Title(text) => {
                    layer.use_text(text.as_str(), 14.0, Mm(60.0), Mm(y), &bold);
                    y -= 12.0;
                }
                Line::Heading(text) => {
                    y -= 3.0;
                    layer.use_text(text.as_str(), 11.0, Mm(15.0), Mm(y), &bold);
                    y -= 7.0;
                }
                Line::Text(text) => {
                    layer.use_text(text.as_str(), 11.0, Mm(15.0), Mm(y), &regular);
                    y -= 7.0;
                }
                Line::Gap => y -= 5.0,
            }
        }

        let file = File::create(path)?;
        doc.save(&mut BufWriter::new(file))
            .map_err(|e| FlowError::Sanction(e.to_string()))?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Line {
    Title(String),
    Heading(String),
    Text(String),
    Gap,
}

fn letter_lines(request: &SanctionRequest, date: NaiveDate) -> Vec<Line> {
    let kyc = &request.kyc;
    let mut lines = vec![
        Line::Title(TITLE.to_string()),
        Line::Text(format!("Date: {}", date.format("%d-%m-%Y"))),
        Line::Heading("Customer Details:".to_string()),
        Line::Text(format!("Name: {}", request.customer.name)),
        Line::Text(format!("Customer ID: {}", request.customer.customer_id)),
        Line::Text(format!("PAN / Aadhaar (provided): {}", kyc.id_number)),
        Line::Text(format!("Date of Birth: {}", kyc.date_of_birth)),
        Line::Text(format!("Monthly Income (provided): INR {:.2}", kyc.income)),
        Line::Text(format!("Employment Type: {}", kyc.employment_type)),
        Line::Heading("Loan Details:".to_string()),
        Line::Text(format!("Loan Amount Sanctioned: INR {:.2}", request.loan_amount)),
        Line::Text(format!("Tenure: {} months", request.tenure_months)),
        Line::Text(format!("Estimated Monthly EMI: INR {:.2}", request.emi)),
        Line::Gap,
    ];
    lines.extend(wrap(TERMS, WRAP_WIDTH).into_iter().map(Line::Text));
    lines.push(Line::Gap);
    lines.push(Line::Text("Thank you for choosing us.".to_string()));
    lines.push(Line::Text("For any queries, contact our support team.".to_string()));
    lines
}

fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.len() + 1 + word.len() > width {
            out.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        out.push(current);
    }
    out
}

#[async_trait]
impl SanctionGenerator for PdfSanctionWriter {
    async fn generate(&self, request: &SanctionRequest) -> Result<PathBuf> {
        let now = Local::now();
        let path = self
            .dir
            .join(Self::file_name(&request.customer.customer_id, now.timestamp()));
        let lines = letter_lines(request, now.date_naive());

        tokio::fs::create_dir_all(&self.dir).await?;
        let target = path.clone();
        tokio::task::spawn_blocking(move || Self::render(&target, &lines))
            .await
            .map_err(|e| FlowError::Sanction(e.to_string()))??;

        info!(
            customer_id = %request.customer.customer_id,
            path = %path.display(),
            "Sanction letter written"
        );
        Ok(path)
    }
}
