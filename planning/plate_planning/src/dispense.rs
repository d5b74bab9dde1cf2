use indexmap::IndexMap;
use rust_decimal::Decimal;
use strum_macros::{Display, EnumString};
use thiserror::Error;
use tracing::{debug, info, warn};
use util::decimal::format_fixed;

use crate::inventory::{Dispensable, Inventory};
use crate::location::{Axis, AxisSelection, IntoLocation, LocationError};
use crate::plate::{Plate, RangeError, WellAddress};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
#[derive(serde::Serialize)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum DispenseKind {
    Single,
    Custom,
    Row,
    Column,
    GradientRow,
    GradientColumn,
    Block,
    FillToVolume,
}

/// Which end of a gradient span receives the low volume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum GradientOrder {
    /// low volume at the start (left/top)
    #[default]
    Forwards,
    /// low volume at the end (right/bottom)
    Backwards,
}

/// One applied dispense operation, volumes in µL.
#[derive(Debug, Clone, PartialEq)]
pub struct DispenseEvent {
    /// 1-based, in the order the dispenses were applied
    pub sequence: usize,
    pub what: Dispensable,
    pub kind: DispenseKind,
    pub dispenses: Vec<(WellAddress, Decimal)>,
}

impl DispenseEvent {
    pub fn total_volume(&self) -> Decimal {
        self.dispenses
            .iter()
            .map(|(_, volume)| *volume)
            .sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display)]
#[derive(serde::Serialize)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum RejectionReason {
    OverVolume,
    NegativeVolume,
}

/// A dispense that was refused, kept so that the report can show where the plan is infeasible.
#[derive(Debug, Clone, PartialEq)]
pub struct RejectedDispense {
    pub what: Dispensable,
    pub kind: DispenseKind,
    pub reason: RejectionReason,
    pub wells: Vec<WellAddress>,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DispenseError {
    #[error(transparent)]
    InvalidLocation(#[from] LocationError),
    #[error(transparent)]
    InvalidRange(#[from] RangeError),
    #[error("Over volume. max_volume_per_well: {max_volume_per_well}, wells: {wells:?}")]
    OverVolume {
        max_volume_per_well: Decimal,
        wells: Vec<String>,
    },
    #[error("Negative volume. wells: {wells:?}")]
    NegativeVolume { wells: Vec<String> },
    #[error("Unknown dispensable, only known stock solutions and solvents can be dispensed. what: {0:?}")]
    UnknownDispensable(Dispensable),
}

impl Plate {
    /// Adds the same volume to each of the given wells.
    pub fn add_to_wells<L: IntoLocation>(
        &mut self,
        inventory: &Inventory,
        what: impl Into<Dispensable>,
        how_much: Decimal,
        locations: impl IntoIterator<Item = L>,
    ) -> Result<(), DispenseError> {
        let dispenses = locations
            .into_iter()
            .map(|location| {
                self.resolve(location)
                    .map(|address| (address, how_much))
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.dispense(inventory, what.into(), DispenseKind::Single, dispenses)
    }

    /// Adds an explicit volume to each well of the map.
    pub fn add_custom<L: IntoLocation>(
        &mut self,
        inventory: &Inventory,
        what: impl Into<Dispensable>,
        dispense_map: impl IntoIterator<Item = (L, Decimal)>,
    ) -> Result<(), DispenseError> {
        let dispenses = dispense_map
            .into_iter()
            .map(|(location, volume)| {
                self.resolve(location)
                    .map(|address| (address, volume))
            })
            .collect::<Result<Vec<_>, _>>()?;

        self.dispense(inventory, what.into(), DispenseKind::Custom, dispenses)
    }

    pub fn add_to_rows(
        &mut self,
        inventory: &Inventory,
        what: impl Into<Dispensable>,
        how_much: Decimal,
        rows: impl Into<AxisSelection>,
    ) -> Result<(), DispenseError> {
        let selection: AxisSelection = rows.into();
        let dispenses = selection
            .0
            .iter()
            .map(|token| self.resolve_axis(Axis::Row, token))
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .flat_map(|row| self.row_addresses(row))
            .map(|address| (address, how_much))
            .collect();

        self.dispense(inventory, what.into(), DispenseKind::Row, dispenses)
    }

    pub fn add_to_columns(
        &mut self,
        inventory: &Inventory,
        what: impl Into<Dispensable>,
        how_much: Decimal,
        columns: impl Into<AxisSelection>,
    ) -> Result<(), DispenseError> {
        let selection: AxisSelection = columns.into();
        let dispenses = selection
            .0
            .iter()
            .map(|token| self.resolve_axis(Axis::Column, token))
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .flat_map(|column| self.column_addresses(column))
            .map(|address| (address, how_much))
            .collect();

        self.dispense(inventory, what.into(), DispenseKind::Column, dispenses)
    }

    /// Linearly increasing volumes from `left` to `right`, both inclusive and in the same row.
    ///
    /// Fails with [`RangeError::InvertedVolumes`] if `lo_volume > hi_volume`.
    #[allow(clippy::too_many_arguments)]
    pub fn add_gradient_to_row(
        &mut self,
        inventory: &Inventory,
        what: impl Into<Dispensable>,
        left: impl IntoLocation,
        right: impl IntoLocation,
        lo_volume: Decimal,
        hi_volume: Decimal,
        order: GradientOrder,
    ) -> Result<(), DispenseError> {
        let left = self.resolve(left)?;
        let right = self.resolve(right)?;
        if left.row != right.row {
            return Err(RangeError::NotInLine {
                axis: Axis::Row,
                start: self.label(left),
                end: self.label(right),
            }
            .into());
        }

        let span = self.span(left, right, left.column, right.column, |column| {
            WellAddress::new(left.row, column)
        })?;
        let dispenses = gradient(span, lo_volume, hi_volume, order)?;

        self.dispense(inventory, what.into(), DispenseKind::GradientRow, dispenses)
    }

    /// Linearly increasing volumes from `top` to `bottom`, both inclusive and in the same column.
    ///
    /// Fails with [`RangeError::InvertedVolumes`] if `lo_volume > hi_volume`.
    #[allow(clippy::too_many_arguments)]
    pub fn add_gradient_to_column(
        &mut self,
        inventory: &Inventory,
        what: impl Into<Dispensable>,
        top: impl IntoLocation,
        bottom: impl IntoLocation,
        lo_volume: Decimal,
        hi_volume: Decimal,
        order: GradientOrder,
    ) -> Result<(), DispenseError> {
        let top = self.resolve(top)?;
        let bottom = self.resolve(bottom)?;
        if top.column != bottom.column {
            return Err(RangeError::NotInLine {
                axis: Axis::Column,
                start: self.label(top),
                end: self.label(bottom),
            }
            .into());
        }

        let span = self.span(top, bottom, top.row, bottom.row, |row| WellAddress::new(row, top.column))?;
        let dispenses = gradient(span, lo_volume, hi_volume, order)?;

        self.dispense(inventory, what.into(), DispenseKind::GradientColumn, dispenses)
    }

    pub fn add_to_block(
        &mut self,
        inventory: &Inventory,
        what: impl Into<Dispensable>,
        how_much: Decimal,
        upper_left: impl IntoLocation,
        bottom_right: impl IntoLocation,
    ) -> Result<(), DispenseError> {
        let upper_left = self.resolve(upper_left)?;
        let bottom_right = self.resolve(bottom_right)?;
        let dispenses = self
            .block(upper_left, bottom_right)?
            .into_iter()
            .map(|address| (address, how_much))
            .collect();

        self.dispense(inventory, what.into(), DispenseKind::Block, dispenses)
    }

    /// Tops up every well of the block to `target_volume`.
    ///
    /// Fails with [`DispenseError::NegativeVolume`] if any well of the block already holds more than the target.
    pub fn fill_block_up_to_volume(
        &mut self,
        inventory: &Inventory,
        what: impl Into<Dispensable>,
        target_volume: Decimal,
        upper_left: impl IntoLocation,
        bottom_right: impl IntoLocation,
    ) -> Result<(), DispenseError> {
        let upper_left = self.resolve(upper_left)?;
        let bottom_right = self.resolve(bottom_right)?;
        let dispenses = self
            .block(upper_left, bottom_right)?
            .into_iter()
            .map(|address| {
                let current = self.wells[self.index_of(address)].volume();
                (address, target_volume - current)
            })
            .collect();

        self.dispense(inventory, what.into(), DispenseKind::FillToVolume, dispenses)
    }

    fn span(
        &self,
        start: WellAddress,
        end: WellAddress,
        from: usize,
        to: usize,
        address_of: impl Fn(usize) -> WellAddress,
    ) -> Result<Vec<WellAddress>, RangeError> {
        if from > to {
            return Err(RangeError::MisorderedSpan {
                start: self.label(start),
                end: self.label(end),
            });
        }
        Ok((from..=to).map(address_of).collect())
    }

    /// Validates and applies one dispense, either every well is updated and the event is logged, or nothing changes.
    fn dispense(
        &mut self,
        inventory: &Inventory,
        what: Dispensable,
        kind: DispenseKind,
        dispenses: Vec<(WellAddress, Decimal)>,
    ) -> Result<(), DispenseError> {
        let contribution = inventory
            .contribution(what)
            .ok_or(DispenseError::UnknownDispensable(what))?;

        let negative: Vec<WellAddress> = dispenses
            .iter()
            .filter(|(_, volume)| *volume < Decimal::ZERO)
            .map(|(address, _)| *address)
            .collect();
        if !negative.is_empty() {
            let wells = self.labels(&negative);
            self.reject(inventory, what, kind, RejectionReason::NegativeVolume, negative);
            return Err(DispenseError::NegativeVolume {
                wells,
            });
        }

        // duplicate wells accumulate
        let mut additions: IndexMap<WellAddress, Decimal> = IndexMap::new();
        for (address, volume) in dispenses.iter() {
            *additions.entry(*address).or_default() += *volume;
        }

        let max_volume_per_well = self.max_volume_per_well();
        let over: Vec<WellAddress> = additions
            .iter()
            .filter(|(address, volume)| self.wells[self.index_of(**address)].volume() + **volume > max_volume_per_well)
            .map(|(address, _)| *address)
            .collect();
        if !over.is_empty() {
            let wells = self.labels(&over);
            self.reject(inventory, what, kind, RejectionReason::OverVolume, over);
            return Err(DispenseError::OverVolume {
                max_volume_per_well,
                wells,
            });
        }

        for (address, volume) in dispenses.iter() {
            let index = self.index_of(*address);
            self.wells[index].add(
                contribution.substance,
                contribution.amount_per_microlitre * volume,
                *volume,
            );
        }

        let event = DispenseEvent {
            sequence: self.events.len() + 1,
            what,
            kind,
            dispenses,
        };
        info!(
            "Dispensed. step: {}, what: '{}', kind: {}, wells: {}, total_volume: {} uL",
            event.sequence,
            inventory.dispensable_name(what),
            kind,
            event.dispenses.len(),
            format_fixed(event.total_volume(), 3)
        );
        debug!("Dispense event. event: {:?}", event);
        self.events.push(event);

        Ok(())
    }

    fn reject(
        &mut self,
        inventory: &Inventory,
        what: Dispensable,
        kind: DispenseKind,
        reason: RejectionReason,
        wells: Vec<WellAddress>,
    ) {
        warn!(
            "Rejected dispense. what: '{}', kind: {}, reason: {}, wells: {:?}",
            inventory.dispensable_name(what),
            kind,
            reason,
            self.labels(&wells)
        );
        self.rejections.push(RejectedDispense {
            what,
            kind,
            reason,
            wells,
        });
    }

    fn labels(&self, addresses: &[WellAddress]) -> Vec<String> {
        addresses
            .iter()
            .map(|address| self.label(*address))
            .collect()
    }
}

/// Evenly spaced volumes over the span, `n - 1` divisions for `n` wells.
fn gradient(
    span: Vec<WellAddress>,
    lo_volume: Decimal,
    hi_volume: Decimal,
    order: GradientOrder,
) -> Result<Vec<(WellAddress, Decimal)>, RangeError> {
    if lo_volume > hi_volume {
        return Err(RangeError::InvertedVolumes {
            lo_volume,
            hi_volume,
        });
    }

    let divisions = Decimal::from(span.len().saturating_sub(1));
    let mut volumes: Vec<Decimal> = (0..span.len())
        .map(|index| match divisions.is_zero() {
            true => lo_volume,
            false => lo_volume + (hi_volume - lo_volume) * Decimal::from(index) / divisions,
        })
        .collect();

    if order == GradientOrder::Backwards {
        volumes.reverse();
    }

    Ok(span.into_iter().zip(volumes).collect())
}

#[cfg(test)]
mod tests {
    use chem::reagent::Reagent;
    use chem::solvent::Solvent;
    use rstest::rstest;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use crate::dispense::{DispenseError, DispenseKind, GradientOrder, RejectionReason};
    use crate::inventory::{Dispensable, Inventory, ReagentKey, SolventKey, StockKey, Substance};
    use crate::location::{Axis, LocationError};
    use crate::plate::{Plate, PlateTemplate, RangeError, WellAddress};

    struct Setup {
        inventory: Inventory,
        reagent: ReagentKey,
        stock: StockKey,
        water: SolventKey,
        plate: Plate,
    }

    fn setup() -> Setup {
        let mut inventory = Inventory::new();
        let reagent = inventory.add_reagent(Reagent::new_solid("sodium sulfate", dec!(142.04)).unwrap());
        let water = inventory.add_solvent(Solvent::new("water", dec!(50)).unwrap());
        let stock = inventory
            .create_from_reagent(reagent, dec!(0.5), water, dec!(10))
            .unwrap();
        let plate = Plate::new("test", PlateTemplate::generic_96_well(dec!(50)).unwrap()).unwrap();

        Setup {
            inventory,
            reagent,
            stock,
            water,
            plate,
        }
    }

    fn volumes(plate: &Plate, locations: &[&str]) -> Vec<Decimal> {
        locations
            .iter()
            .map(|location| plate.well_at(*location).unwrap().volume())
            .collect()
    }

    #[test]
    fn concentration_of_a_stock_and_solvent_mix() {
        // given
        let Setup {
            inventory,
            reagent,
            stock,
            water,
            mut plate,
        } = setup();

        // when
        plate
            .add_to_wells(&inventory, stock, dec!(2.0), ["A:1"])
            .unwrap();
        plate
            .add_to_wells(&inventory, water, dec!(8.0), ["A:1"])
            .unwrap();

        // then
        let well = plate.well_at("A:1").unwrap();
        assert_eq!(well.volume(), dec!(10.0));
        assert_eq!(well.amount_of(Substance::Reagent(reagent)), dec!(1.0));
        assert_eq!(well.concentration_of(Substance::Reagent(reagent)), Some(dec!(0.1)));
        assert_eq!(well.amount_of(Substance::Solvent(water)), dec!(8.0));
    }

    #[rstest]
    #[case(GradientOrder::Forwards, vec![dec!(2), dec!(3), dec!(4), dec!(5), dec!(6), dec!(7), dec!(8), dec!(9)])]
    #[case(GradientOrder::Backwards, vec![dec!(9), dec!(8), dec!(7), dec!(6), dec!(5), dec!(4), dec!(3), dec!(2)])]
    fn gradient_to_row(#[case] order: GradientOrder, #[case] expected_volumes: Vec<Decimal>) {
        // given
        let Setup {
            inventory,
            stock,
            mut plate,
            ..
        } = setup();

        // when
        plate
            .add_gradient_to_row(&inventory, stock, "A:1", "A:8", dec!(2.0), dec!(9.0), order)
            .unwrap();

        // then
        assert_eq!(
            volumes(&plate, &["A:1", "A:2", "A:3", "A:4", "A:5", "A:6", "A:7", "A:8"]),
            expected_volumes
        );
        assert_eq!(volumes(&plate, &["A:9", "B:1"]), vec![dec!(0), dec!(0)]);
        assert_eq!(plate.events()[0].kind, DispenseKind::GradientRow);
    }

    #[test]
    fn gradient_to_column_single_well_uses_lo_volume() {
        // given
        let Setup {
            inventory,
            water,
            mut plate,
            ..
        } = setup();

        // when
        plate
            .add_gradient_to_column(&inventory, water, "C:3", "C:3", dec!(4), dec!(10), GradientOrder::Forwards)
            .unwrap();

        // then
        assert_eq!(volumes(&plate, &["C:3"]), vec![dec!(4)]);
    }

    #[test]
    fn gradient_to_column_with_uneven_spacing() {
        // given
        let Setup {
            inventory,
            water,
            mut plate,
            ..
        } = setup();

        // when
        plate
            .add_gradient_to_column(&inventory, water, "A:1", "C:1", dec!(1), dec!(2), GradientOrder::Backwards)
            .unwrap();

        // then
        assert_eq!(volumes(&plate, &["A:1", "B:1", "C:1"]), vec![dec!(2), dec!(1.5), dec!(1)]);
    }

    #[rstest]
    #[case("A:1", "B:3", dec!(1), dec!(2))]
    #[case("A:3", "A:1", dec!(1), dec!(2))]
    #[case("A:1", "A:3", dec!(3), dec!(2))]
    fn gradient_to_row_invalid_range(
        #[case] left: &str,
        #[case] right: &str,
        #[case] lo_volume: Decimal,
        #[case] hi_volume: Decimal,
    ) {
        // given
        let Setup {
            inventory,
            stock,
            mut plate,
            ..
        } = setup();

        // when
        let result = plate.add_gradient_to_row(
            &inventory,
            stock,
            left,
            right,
            lo_volume,
            hi_volume,
            GradientOrder::Forwards,
        );

        // then
        assert!(matches!(result, Err(DispenseError::InvalidRange(_))));
        assert!(plate.events().is_empty());
        assert!(plate.rejections().is_empty());
    }

    #[rstest]
    #[case("A:1", "C:2", dec!(1), dec!(2), RangeError::NotInLine { axis: Axis::Column, start: "A:1".to_string(), end: "C:2".to_string() })]
    #[case("C:1", "A:1", dec!(1), dec!(2), RangeError::MisorderedSpan { start: "C:1".to_string(), end: "A:1".to_string() })]
    #[case("A:1", "C:1", dec!(3), dec!(2), RangeError::InvertedVolumes { lo_volume: dec!(3), hi_volume: dec!(2) })]
    fn gradient_to_column_invalid_range(
        #[case] top: &str,
        #[case] bottom: &str,
        #[case] lo_volume: Decimal,
        #[case] hi_volume: Decimal,
        #[case] expected_error: RangeError,
    ) {
        // given
        let Setup {
            inventory,
            stock,
            mut plate,
            ..
        } = setup();

        // when
        let result = plate.add_gradient_to_column(
            &inventory,
            stock,
            top,
            bottom,
            lo_volume,
            hi_volume,
            GradientOrder::Forwards,
        );

        // then
        assert_eq!(result, Err(DispenseError::InvalidRange(expected_error)));
        assert!(plate.events().is_empty());
        assert!(plate.rejections().is_empty());
    }

    #[test]
    fn rows_and_columns_accept_ordinals_and_labels() {
        // given
        let Setup {
            inventory,
            water,
            mut plate,
            ..
        } = setup();

        // when
        plate
            .add_to_rows(&inventory, water, dec!(1), vec!["A", "3"])
            .unwrap();
        plate
            .add_to_columns(&inventory, water, dec!(2), 12_usize)
            .unwrap();

        // then
        assert_eq!(
            volumes(&plate, &["A:1", "B:1", "C:1", "A:12", "B:12", "H:12"]),
            vec![dec!(1), dec!(0), dec!(1), dec!(3), dec!(2), dec!(2)]
        );
        assert_eq!(plate.events()[0].dispenses.len(), 24);
        assert_eq!(plate.events()[1].dispenses.len(), 8);
    }

    #[test]
    fn rows_with_unknown_label() {
        // given
        let Setup {
            inventory,
            water,
            mut plate,
            ..
        } = setup();

        // when
        let result = plate.add_to_rows(&inventory, water, dec!(1), "Z");

        // then
        assert!(matches!(
            result,
            Err(DispenseError::InvalidLocation(LocationError::UnknownLabel { .. }))
        ));
    }

    #[test]
    fn fill_block_up_to_volume_is_idempotent() {
        // given
        let Setup {
            inventory,
            stock,
            water,
            mut plate,
            ..
        } = setup();
        plate
            .add_gradient_to_row(&inventory, stock, "A:1", "A:3", dec!(1), dec!(3), GradientOrder::Forwards)
            .unwrap();

        // when
        plate
            .fill_block_up_to_volume(&inventory, water, dec!(10), "A:1", "B:3")
            .unwrap();
        let after_first_fill = plate.wells.clone();
        plate
            .fill_block_up_to_volume(&inventory, water, dec!(10), "A:1", "B:3")
            .unwrap();

        // then
        assert_eq!(plate.wells, after_first_fill);
        assert!(plate.events()[2]
            .dispenses
            .iter()
            .all(|(_, volume)| volume.is_zero()));
        assert_eq!(
            volumes(&plate, &["A:1", "A:2", "A:3", "B:1", "B:2", "B:3"]),
            vec![dec!(10); 6]
        );
        assert_eq!(plate.events()[1].dispenses[0].1, dec!(9));
    }

    #[test]
    fn fill_block_below_current_volume() {
        // given
        let Setup {
            inventory,
            stock,
            water,
            mut plate,
            ..
        } = setup();
        plate
            .add_to_wells(&inventory, stock, dec!(20), ["B:2"])
            .unwrap();

        // when
        let result = plate.fill_block_up_to_volume(&inventory, water, dec!(10), "A:1", "B:3");

        // then
        assert_eq!(
            result,
            Err(DispenseError::NegativeVolume {
                wells: vec!["B:2".to_string()]
            })
        );
        assert_eq!(plate.events().len(), 1);
        assert_eq!(plate.rejections().len(), 1);
        assert_eq!(plate.rejections()[0].reason, RejectionReason::NegativeVolume);
        assert_eq!(plate.rejections()[0].wells, vec![WellAddress::new(1, 1)]);
        assert_eq!(volumes(&plate, &["A:1", "B:2"]), vec![dec!(0), dec!(20)]);
    }

    #[test]
    fn over_volume_is_atomic() {
        // given
        let Setup {
            inventory,
            stock,
            water,
            mut plate,
            ..
        } = setup();
        plate
            .add_to_wells(&inventory, water, dec!(45), ["A:2", "A:4"])
            .unwrap();
        let wells_before = plate.wells.clone();

        // when
        let result = plate.add_to_rows(&inventory, stock, dec!(10), "A");

        // then
        assert_eq!(
            result,
            Err(DispenseError::OverVolume {
                max_volume_per_well: dec!(50),
                wells: vec!["A:2".to_string(), "A:4".to_string()],
            })
        );
        assert_eq!(plate.wells, wells_before);
        assert_eq!(plate.events().len(), 1);
        assert_eq!(plate.rejections()[0].reason, RejectionReason::OverVolume);
        assert_eq!(plate.rejections()[0].kind, DispenseKind::Row);
    }

    #[test]
    fn exactly_max_volume_is_allowed() {
        // given
        let Setup {
            inventory,
            water,
            mut plate,
            ..
        } = setup();

        // when
        let result = plate.add_to_block(&inventory, water, dec!(50), "A:1", "H:12");

        // then
        assert!(result.is_ok());
        assert_eq!(volumes(&plate, &["H:12"]), vec![dec!(50)]);
    }

    #[test]
    fn duplicate_wells_accumulate() {
        // given
        let Setup {
            inventory,
            water,
            mut plate,
            ..
        } = setup();

        // when
        let ok = plate.add_custom(&inventory, water, vec![("A:1", dec!(20)), ("1:1", dec!(20))]);
        let over = plate.add_custom(&inventory, water, vec![("A:1", dec!(6)), ("A:1", dec!(5))]);

        // then
        assert!(ok.is_ok());
        assert_eq!(volumes(&plate, &["A:1"]), vec![dec!(40)]);
        assert!(matches!(over, Err(DispenseError::OverVolume { ref wells, .. }) if wells == &vec!["A:1".to_string()]));
    }

    #[test]
    fn negative_requested_volume() {
        // given
        let Setup {
            inventory,
            water,
            mut plate,
            ..
        } = setup();

        // when
        let result = plate.add_to_wells(&inventory, water, dec!(-1), ["A:1", "A:2"]);

        // then
        assert!(matches!(result, Err(DispenseError::NegativeVolume { .. })));
        assert!(plate.events().is_empty());
    }

    #[test]
    fn unknown_dispensable() {
        // given
        let Setup {
            stock,
            mut plate,
            ..
        } = setup();
        let empty = Inventory::new();

        // when
        let result = plate.add_to_wells(&empty, stock, dec!(1), ["A:1"]);

        // then
        assert_eq!(result, Err(DispenseError::UnknownDispensable(Dispensable::Stock(stock))));
        assert!(plate.rejections().is_empty());
    }

    #[test]
    fn invalid_location_mutates_nothing() {
        // given
        let Setup {
            inventory,
            water,
            mut plate,
            ..
        } = setup();

        // when
        let result = plate.add_to_wells(&inventory, water, dec!(1), ["A:1", "Z:1"]);

        // then
        assert!(matches!(result, Err(DispenseError::InvalidLocation(_))));
        assert_eq!(volumes(&plate, &["A:1"]), vec![dec!(0)]);
        assert!(plate.events().is_empty());
    }

    #[test]
    fn block_with_misordered_corners() {
        // given
        let Setup {
            inventory,
            water,
            mut plate,
            ..
        } = setup();

        // when
        let result = plate.add_to_block(&inventory, water, dec!(1), "B:2", "A:1");

        // then
        assert!(matches!(
            result,
            Err(DispenseError::InvalidRange(RangeError::MisorderedCorners { .. }))
        ));
    }

    #[test]
    fn well_volume_is_the_sum_of_the_log_and_replay_matches() {
        // given
        let Setup {
            inventory,
            stock,
            water,
            mut plate,
            ..
        } = setup();

        // when
        plate
            .add_to_block(&inventory, stock, dec!(5), "A:1", "C:4")
            .unwrap();
        plate
            .add_gradient_to_column(&inventory, stock, "A:2", "H:2", dec!(0), dec!(7), GradientOrder::Forwards)
            .unwrap();
        plate
            .add_to_columns(&inventory, water, dec!(3), [1_usize, 2])
            .unwrap();
        let _ = plate.add_to_block(&inventory, water, dec!(100), "A:1", "A:1");
        plate
            .fill_block_up_to_volume(&inventory, water, dec!(30), "A:1", "H:12")
            .unwrap();

        // then
        for (address, well) in plate.wells() {
            let logged: Decimal = plate
                .events()
                .iter()
                .flat_map(|event| event.dispenses.iter())
                .filter(|(candidate, _)| *candidate == address)
                .map(|(_, volume)| *volume)
                .sum();
            assert_eq!(well.volume(), logged);
            assert_eq!(well.volume(), dec!(30));
        }
        assert_eq!(plate.replay(&inventory), plate.wells);
        assert_eq!(
            plate
                .events()
                .iter()
                .map(|event| event.sequence)
                .collect::<Vec<_>>(),
            vec![1, 2, 3, 4]
        );
    }
}
