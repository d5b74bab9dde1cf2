use std::collections::HashSet;
use std::fmt::{Display, Formatter};

use rust_decimal::Decimal;
use thiserror::Error;
use tracing::info;
use util::decimal::format_fixed;

use crate::dispense::{DispenseEvent, RejectedDispense};
use crate::inventory::Inventory;
use crate::location::{Axis, AxisToken, IntoLocation, LocationError};
use crate::well::Well;

/// How the rows or columns of a template are labelled.
#[derive(Debug, Clone, PartialEq)]
pub enum AxisLabels {
    /// Default labels, rows are lettered `A, B, ..., Z, AA, AB, ...`, columns are numbered `1, 2, ...`
    Count(usize),
    Labels(Vec<String>),
}

#[derive(Debug, Clone, PartialEq)]
#[derive(serde::Serialize)]
pub struct PlateTemplate {
    make: String,
    rows: Vec<String>,
    columns: Vec<String>,
    /// µL
    max_volume_per_well: Decimal,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlateError {
    #[error("Plate name must not be blank.")]
    BlankName,
    #[error("Invalid {0} count, must be > 0.")]
    InvalidCount(Axis),
    #[error("Empty {0} labels.")]
    EmptyLabels(Axis),
    #[error("Blank {axis} label. index: {index}")]
    BlankLabel { axis: Axis, index: usize },
    #[error("Duplicate {axis} label. label: '{label}'")]
    DuplicateLabel { axis: Axis, label: String },
    #[error("Invalid max volume per well, must be > 0. max_volume_per_well: {0}")]
    InvalidMaxVolume(Decimal),
}

impl PlateTemplate {
    pub fn new(
        make: &str,
        rows: AxisLabels,
        columns: AxisLabels,
        max_volume_per_well: Decimal,
    ) -> Result<Self, PlateError> {
        let rows = build_labels(Axis::Row, rows)?;
        let columns = build_labels(Axis::Column, columns)?;

        if max_volume_per_well <= Decimal::ZERO {
            return Err(PlateError::InvalidMaxVolume(max_volume_per_well));
        }

        Ok(Self {
            make: make.trim().to_string(),
            rows,
            columns,
            max_volume_per_well,
        })
    }

    /// 8 rows (A-H) x 12 columns (1-12)
    pub fn generic_96_well(max_volume_per_well: Decimal) -> Result<Self, PlateError> {
        Self::new(
            "generic 96 well plate",
            AxisLabels::Count(8),
            AxisLabels::Count(12),
            max_volume_per_well,
        )
    }

    /// 16 rows (A-P) x 24 columns (1-24)
    pub fn generic_384_well(max_volume_per_well: Decimal) -> Result<Self, PlateError> {
        Self::new(
            "generic 384 well plate",
            AxisLabels::Count(16),
            AxisLabels::Count(24),
            max_volume_per_well,
        )
    }

    pub fn make(&self) -> &str {
        &self.make
    }

    pub fn rows(&self) -> &[String] {
        &self.rows
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn max_volume_per_well(&self) -> Decimal {
        self.max_volume_per_well
    }

    fn labels(&self, axis: Axis) -> &[String] {
        match axis {
            Axis::Row => &self.rows,
            Axis::Column => &self.columns,
        }
    }
}

fn build_labels(axis: Axis, labels: AxisLabels) -> Result<Vec<String>, PlateError> {
    match labels {
        AxisLabels::Count(0) => Err(PlateError::InvalidCount(axis)),
        AxisLabels::Count(count) => Ok((0..count)
            .map(|index| match axis {
                Axis::Row => letters(index),
                Axis::Column => (index + 1).to_string(),
            })
            .collect()),
        AxisLabels::Labels(labels) if labels.is_empty() => Err(PlateError::EmptyLabels(axis)),
        AxisLabels::Labels(labels) => {
            let mut seen = HashSet::new();
            labels
                .into_iter()
                .enumerate()
                .map(|(index, label)| {
                    let label = label.trim().to_string();
                    if label.is_empty() {
                        return Err(PlateError::BlankLabel {
                            axis,
                            index,
                        });
                    }
                    if !seen.insert(label.clone()) {
                        return Err(PlateError::DuplicateLabel {
                            axis,
                            label,
                        });
                    }
                    Ok(label)
                })
                .collect()
        }
    }
}

/// 0 => `A`, 25 => `Z`, 26 => `AA`
fn letters(index: usize) -> String {
    let mut chars = vec![];
    let mut remainder = index;
    loop {
        chars.push((b'A' + (remainder % 26) as u8) as char);
        if remainder < 26 {
            break;
        }
        remainder = remainder / 26 - 1;
    }
    chars.iter().rev().collect()
}

/// A resolved well address, zero-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WellAddress {
    pub row: usize,
    pub column: usize,
}

impl WellAddress {
    pub fn new(row: usize, column: usize) -> Self {
        Self {
            row,
            column,
        }
    }

    pub fn row_ordinal(&self) -> usize {
        self.row + 1
    }

    pub fn column_ordinal(&self) -> usize {
        self.column + 1
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum RangeError {
    #[error("Well is outside the plate. well: '{well}', rows: {rows}, columns: {columns}")]
    OutOfBounds { well: String, rows: usize, columns: usize },
    #[error("Invalid block, corners are not upper-left and bottom-right. upper_left: '{upper_left}', bottom_right: '{bottom_right}'")]
    MisorderedCorners { upper_left: String, bottom_right: String },
    #[error("Invalid span, endpoints must be in the same {axis}. start: '{start}', end: '{end}'")]
    NotInLine { axis: Axis, start: String, end: String },
    #[error("Invalid span, start must not come after end. start: '{start}', end: '{end}'")]
    MisorderedSpan { start: String, end: String },
    #[error("Invalid gradient, low volume exceeds high volume. lo_volume: {lo_volume}, hi_volume: {hi_volume}")]
    InvertedVolumes { lo_volume: Decimal, hi_volume: Decimal },
}

/// A named plate, its wells, and the ordered log of dispenses applied to them.
#[derive(Debug, Clone)]
pub struct Plate {
    name: String,
    template: PlateTemplate,
    /// row-major
    pub(crate) wells: Vec<Well>,
    pub(crate) events: Vec<DispenseEvent>,
    pub(crate) rejections: Vec<RejectedDispense>,
}

impl Plate {
    pub fn new(name: &str, template: PlateTemplate) -> Result<Self, PlateError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(PlateError::BlankName);
        }

        let wells = vec![Well::default(); template.rows.len() * template.columns.len()];

        let plate = Self {
            name: name.to_string(),
            template,
            wells,
            events: vec![],
            rejections: vec![],
        };
        info!("Created plate. plate: {}", plate);

        Ok(plate)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn template(&self) -> &PlateTemplate {
        &self.template
    }

    pub fn row_count(&self) -> usize {
        self.template.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.template.columns.len()
    }

    pub fn max_volume_per_well(&self) -> Decimal {
        self.template.max_volume_per_well
    }

    pub fn resolve(&self, location: impl IntoLocation) -> Result<WellAddress, LocationError> {
        let location = location.into_location()?;
        let row = self.resolve_axis(Axis::Row, &location.row)?;
        let column = self.resolve_axis(Axis::Column, &location.column)?;

        Ok(WellAddress::new(row, column))
    }

    /// Resolves a row or column token to a zero-based index.
    pub fn resolve_axis(&self, axis: Axis, token: &AxisToken) -> Result<usize, LocationError> {
        let labels = self.template.labels(axis);
        match token {
            AxisToken::Ordinal(ordinal) if *ordinal >= 1 && *ordinal <= labels.len() => Ok(ordinal - 1),
            AxisToken::Ordinal(ordinal) => Err(LocationError::OrdinalOutOfRange {
                axis,
                ordinal: *ordinal,
                count: labels.len(),
            }),
            AxisToken::Label(label) => labels
                .iter()
                .position(|candidate| candidate == label)
                .ok_or_else(|| LocationError::UnknownLabel {
                    axis,
                    label: label.clone(),
                    labels: labels.to_vec(),
                }),
        }
    }

    /// e.g. `A:1`, addresses outside the plate fall back to one-based ordinals, e.g. `21:1`
    pub fn label(&self, address: WellAddress) -> String {
        match (
            self.template.rows.get(address.row),
            self.template.columns.get(address.column),
        ) {
            (Some(row), Some(column)) => format!("{}:{}", row, column),
            _ => format!("{}:{}", address.row_ordinal(), address.column_ordinal()),
        }
    }

    pub fn contains(&self, address: WellAddress) -> bool {
        address.row < self.row_count() && address.column < self.column_count()
    }

    pub fn well(&self, address: WellAddress) -> Option<&Well> {
        if !self.contains(address) {
            return None;
        }
        self.wells.get(self.index_of(address))
    }

    pub fn well_at(&self, location: impl IntoLocation) -> Result<&Well, LocationError> {
        let address = self.resolve(location)?;
        Ok(&self.wells[self.index_of(address)])
    }

    /// All wells, row-major.
    pub fn wells(&self) -> impl Iterator<Item = (WellAddress, &Well)> {
        let columns = self.column_count();
        self.wells
            .iter()
            .enumerate()
            .map(move |(index, well)| (WellAddress::new(index / columns, index % columns), well))
    }

    pub fn row_addresses(&self, row: usize) -> Vec<WellAddress> {
        (0..self.column_count())
            .map(|column| WellAddress::new(row, column))
            .collect()
    }

    pub fn column_addresses(&self, column: usize) -> Vec<WellAddress> {
        (0..self.row_count())
            .map(|row| WellAddress::new(row, column))
            .collect()
    }

    /// The inclusive rectangle between two corners, row-major.
    pub fn block(&self, upper_left: WellAddress, bottom_right: WellAddress) -> Result<Vec<WellAddress>, RangeError> {
        if let Some(outside) = [upper_left, bottom_right]
            .into_iter()
            .find(|address| !self.contains(*address))
        {
            return Err(RangeError::OutOfBounds {
                well: self.label(outside),
                rows: self.row_count(),
                columns: self.column_count(),
            });
        }
        if upper_left.row > bottom_right.row || upper_left.column > bottom_right.column {
            return Err(RangeError::MisorderedCorners {
                upper_left: self.label(upper_left),
                bottom_right: self.label(bottom_right),
            });
        }

        Ok((upper_left.row..=bottom_right.row)
            .flat_map(|row| (upper_left.column..=bottom_right.column).map(move |column| WellAddress::new(row, column)))
            .collect())
    }

    /// Successful dispenses, in the order they were applied.
    pub fn events(&self) -> &[DispenseEvent] {
        &self.events
    }

    /// Dispenses that were refused because of an over-volume or negative-volume condition.
    pub fn rejections(&self) -> &[RejectedDispense] {
        &self.rejections
    }

    /// Recomputes the well state from the dispense log alone.
    pub fn replay(&self, inventory: &Inventory) -> Vec<Well> {
        self.events
            .iter()
            .fold(
                vec![Well::default(); self.wells.len()],
                |mut wells, event| {
                    if let Some(contribution) = inventory.contribution(event.what) {
                        for (address, volume) in event.dispenses.iter() {
                            wells[self.index_of(*address)].add(
                                contribution.substance,
                                contribution.amount_per_microlitre * volume,
                                *volume,
                            );
                        }
                    }
                    wells
                },
            )
    }

    pub(crate) fn index_of(&self, address: WellAddress) -> usize {
        address.row * self.column_count() + address.column
    }
}

impl Display for Plate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({}, {}x{}, max {} uL/well)",
            self.name,
            self.template.make,
            self.row_count(),
            self.column_count(),
            format_fixed(self.template.max_volume_per_well, 3)
        )
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use rust_decimal_macros::dec;

    use crate::location::{Axis, LocationError};
    use crate::plate::{letters, AxisLabels, Plate, PlateError, PlateTemplate, RangeError, WellAddress};

    fn plate_96() -> Plate {
        Plate::new("test", PlateTemplate::generic_96_well(dec!(50)).unwrap()).unwrap()
    }

    #[rstest]
    #[case(0, "A")]
    #[case(7, "H")]
    #[case(25, "Z")]
    #[case(26, "AA")]
    #[case(27, "AB")]
    #[case(51, "AZ")]
    #[case(52, "BA")]
    #[case(701, "ZZ")]
    #[case(702, "AAA")]
    fn row_letters(#[case] index: usize, #[case] expected_label: &str) {
        assert_eq!(letters(index), expected_label);
    }

    #[test]
    fn generic_templates() {
        // when
        let plate_96 = PlateTemplate::generic_96_well(dec!(200)).unwrap();
        let plate_384 = PlateTemplate::generic_384_well(dec!(50)).unwrap();

        // then
        assert_eq!(plate_96.rows().first().map(String::as_str), Some("A"));
        assert_eq!(plate_96.rows().last().map(String::as_str), Some("H"));
        assert_eq!(plate_96.columns().last().map(String::as_str), Some("12"));
        assert_eq!(plate_384.rows().len(), 16);
        assert_eq!(plate_384.rows().last().map(String::as_str), Some("P"));
        assert_eq!(plate_384.columns().len(), 24);
    }

    #[rstest]
    #[case(AxisLabels::Count(0), AxisLabels::Count(1), dec!(1), PlateError::InvalidCount(Axis::Row))]
    #[case(AxisLabels::Count(1), AxisLabels::Labels(vec![]), dec!(1), PlateError::EmptyLabels(Axis::Column))]
    #[case(
        AxisLabels::Labels(vec!["x".to_string(), " ".to_string()]),
        AxisLabels::Count(1),
        dec!(1),
        PlateError::BlankLabel { axis: Axis::Row, index: 1 }
    )]
    #[case(
        AxisLabels::Count(1),
        AxisLabels::Labels(vec!["a".to_string(), "b".to_string(), "a".to_string()]),
        dec!(1),
        PlateError::DuplicateLabel { axis: Axis::Column, label: "a".to_string() }
    )]
    #[case(AxisLabels::Count(1), AxisLabels::Count(1), dec!(0), PlateError::InvalidMaxVolume(dec!(0)))]
    fn invalid_template(
        #[case] rows: AxisLabels,
        #[case] columns: AxisLabels,
        #[case] max_volume_per_well: rust_decimal::Decimal,
        #[case] expected_error: PlateError,
    ) {
        assert_eq!(
            PlateTemplate::new("custom", rows, columns, max_volume_per_well),
            Err(expected_error)
        );
    }

    #[test]
    fn blank_plate_name() {
        assert_eq!(
            Plate::new(" ", PlateTemplate::generic_96_well(dec!(50)).unwrap()).err(),
            Some(PlateError::BlankName)
        );
    }

    #[rstest]
    #[case("A:1", WellAddress::new(0, 0))]
    #[case("1:1", WellAddress::new(0, 0))]
    #[case("H:12", WellAddress::new(7, 11))]
    #[case("8:12", WellAddress::new(7, 11))]
    #[case("B:3", WellAddress::new(1, 2))]
    fn resolve(#[case] location: &str, #[case] expected_address: WellAddress) {
        // given
        let plate = plate_96();

        // expect
        assert_eq!(plate.resolve(location), Ok(expected_address));
    }

    #[test]
    fn resolve_label_and_ordinal_to_the_same_well() {
        // given
        let plate = plate_96();

        // expect
        assert_eq!(plate.resolve("A:1"), plate.resolve("1:1"));
        assert_eq!(plate.resolve(("A", 1_usize)), plate.resolve((1_usize, 1_usize)));
    }

    #[test]
    fn resolve_unknown_label() {
        // given
        let plate = plate_96();

        // when
        let result = plate.resolve("Z:1");

        // then
        assert!(matches!(
            result,
            Err(LocationError::UnknownLabel { axis: Axis::Row, ref label, .. }) if label == "Z"
        ));
    }

    #[rstest]
    #[case("0:1", Axis::Row, 0)]
    #[case("9:1", Axis::Row, 9)]
    #[case("A:13", Axis::Column, 13)]
    fn resolve_out_of_range(#[case] location: &str, #[case] expected_axis: Axis, #[case] expected_ordinal: usize) {
        // given
        let plate = plate_96();

        // when
        let result = plate.resolve(location);

        // then
        assert!(matches!(
            result,
            Err(LocationError::OrdinalOutOfRange { axis, ordinal, .. }) if axis == expected_axis && ordinal == expected_ordinal
        ));
    }

    #[test]
    fn custom_labels() {
        // given
        let template = PlateTemplate::new(
            "reaction block",
            AxisLabels::Labels(vec!["top".to_string(), "bottom".to_string()]),
            AxisLabels::Labels(vec!["left".to_string(), "right".to_string()]),
            dec!(1000),
        )
        .unwrap();
        let plate = Plate::new("block", template).unwrap();

        // expect
        assert_eq!(plate.resolve("bottom:left"), Ok(WellAddress::new(1, 0)));
        assert_eq!(plate.resolve("2:2"), Ok(WellAddress::new(1, 1)));
        assert_eq!(plate.label(WellAddress::new(0, 1)), "top:right");
    }

    #[test]
    fn block_is_row_major_and_inclusive() {
        // given
        let plate = plate_96();

        // when
        let block = plate
            .block(WellAddress::new(1, 1), WellAddress::new(2, 3))
            .unwrap();

        // then
        let labels: Vec<String> = block
            .into_iter()
            .map(|address| plate.label(address))
            .collect();
        assert_eq!(labels, vec!["B:2", "B:3", "B:4", "C:2", "C:3", "C:4"]);
    }

    #[rstest]
    #[case(WellAddress::new(2, 0), WellAddress::new(1, 0))]
    #[case(WellAddress::new(0, 2), WellAddress::new(0, 1))]
    fn block_misordered(#[case] upper_left: WellAddress, #[case] bottom_right: WellAddress) {
        // given
        let plate = plate_96();

        // expect
        assert!(matches!(
            plate.block(upper_left, bottom_right),
            Err(RangeError::MisorderedCorners { .. })
        ));
    }

    #[rstest]
    #[case(WellAddress::new(0, 0), WellAddress::new(9, 0), "10:1")]
    #[case(WellAddress::new(0, 0), WellAddress::new(0, 12), "1:13")]
    #[case(WellAddress::new(20, 0), WellAddress::new(0, 0), "21:1")]
    fn block_outside_the_plate(
        #[case] upper_left: WellAddress,
        #[case] bottom_right: WellAddress,
        #[case] expected_well: &str,
    ) {
        // given
        let plate = plate_96();

        // when
        let result = plate.block(upper_left, bottom_right);

        // then
        assert_eq!(
            result,
            Err(RangeError::OutOfBounds {
                well: expected_well.to_string(),
                rows: 8,
                columns: 12,
            })
        );
    }

    #[rstest]
    #[case(WellAddress::new(7, 11), "H:12")]
    #[case(WellAddress::new(8, 0), "9:1")]
    #[case(WellAddress::new(0, 12), "1:13")]
    fn label_falls_back_to_ordinals(#[case] address: WellAddress, #[case] expected: &str) {
        // given
        let plate = plate_96();

        // expect
        assert_eq!(plate.label(address), expected);
    }

    #[test]
    fn display() {
        assert_eq!(
            plate_96().to_string(),
            "test (generic 96 well plate, 8x12, max 50.000 uL/well)"
        );
    }
}
