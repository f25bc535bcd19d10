//! Shared fixture: a small three-hierarchy cube (Gender, Store, Measures)
//! with an in-memory fact table that rolls leaf facts up to any ancestor
//! coordinate. Cells can be forced pending per member to exercise the
//! retry protocol, and reads are counted for memoization tests.
#![allow(dead_code)]

use cube_calc::{
    AggregatorRegistry, CellReader, CellValue, Datum, EngineConfig, Evaluator, TupleList,
};
use cube_model::{MemberId, Schema};
use std::cell::{Cell, RefCell};
use std::collections::HashSet;

pub struct Cube {
    pub schema: Schema,
    pub cells: FactCells,
    pub config: EngineConfig,
    pub aggregators: AggregatorRegistry,
}

impl Cube {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        let mut b = Schema::builder();

        let gender_dim = b.add_dimension("Gender");
        let gender = b.add_hierarchy(gender_dim, "Gender", Some("All Gender"));
        let gender_level = b.add_level(gender, "Gender", Some(2));
        let all_gender = b.all_member_of(gender).unwrap();
        let f = b.add_member(gender_level, Some(all_gender), "F").unwrap();
        let m = b.add_member(gender_level, Some(all_gender), "M").unwrap();

        let store_dim = b.add_dimension("Store");
        let store = b.add_hierarchy(store_dim, "Store", Some("All Stores"));
        let country_level = b.add_level(store, "Country", Some(2));
        let state_level = b.add_level(store, "State", None);
        let all_stores = b.all_member_of(store).unwrap();
        let usa = b.add_member(country_level, Some(all_stores), "USA").unwrap();
        let canada = b
            .add_member(country_level, Some(all_stores), "Canada")
            .unwrap();
        let ca = b.add_member(state_level, Some(usa), "CA").unwrap();
        let or = b.add_member(state_level, Some(usa), "OR").unwrap();
        let wa = b.add_member(state_level, Some(usa), "WA").unwrap();
        let bc = b.add_member(state_level, Some(canada), "BC").unwrap();
        // No facts reference NV; it stays null under every measure.
        let nv = b.add_member(state_level, Some(canada), "NV").unwrap();

        let measures_dim = b.add_dimension("Measures");
        let measures = b.add_hierarchy(measures_dim, "Measures", None);
        let measures_level = b.add_level(measures, "MeasuresLevel", None);
        let unit_sales = b.add_member(measures_level, None, "Unit Sales").unwrap();
        let store_sales = b.add_member(measures_level, None, "Store Sales").unwrap();

        let schema = b.build().unwrap();

        let mut cells = FactCells::new(unit_sales, store_sales);
        // Leaf facts: (gender, state) -> (unit sales, store sales). (F, BC)
        // is deliberately absent so Canada is sparse under F.
        cells.add_fact(&schema, f, ca, Some(10.0), Some(100.0));
        cells.add_fact(&schema, f, or, Some(20.0), Some(200.0));
        cells.add_fact(&schema, f, wa, Some(30.0), Some(300.0));
        cells.add_fact(&schema, m, ca, Some(40.0), Some(400.0));
        cells.add_fact(&schema, m, or, Some(30.0), Some(350.0));
        cells.add_fact(&schema, m, wa, Some(50.0), Some(500.0));
        cells.add_fact(&schema, m, bc, Some(60.0), Some(600.0));
        // Sparse under F: BC has store sales but no unit sales.
        cells.add_fact(&schema, f, bc, None, Some(50.0));
        let _ = nv;

        Self {
            schema,
            cells,
            config,
            aggregators: AggregatorRegistry::default(),
        }
    }

    pub fn member(&self, unique_name: &str) -> MemberId {
        self.schema
            .member_by_unique_name(unique_name)
            .unwrap_or_else(|| panic!("no member named {unique_name}"))
    }

    pub fn all_gender(&self) -> MemberId {
        self.member("[Gender].[All Gender]")
    }

    pub fn all_stores(&self) -> MemberId {
        self.member("[Store].[All Stores]")
    }

    pub fn gender(&self, name: &str) -> MemberId {
        self.member(&format!("[Gender].[All Gender].[{name}]"))
    }

    pub fn country(&self, name: &str) -> MemberId {
        self.member(&format!("[Store].[All Stores].[{name}]"))
    }

    pub fn state(&self, country: &str, name: &str) -> MemberId {
        self.member(&format!("[Store].[All Stores].[{country}].[{name}]"))
    }

    pub fn measure(&self, name: &str) -> MemberId {
        self.member(&format!("[Measures].[{name}]"))
    }

    pub fn evaluator(&self) -> Evaluator<'_> {
        let mut ev = Evaluator::new(&self.schema, &self.cells, &self.config);
        ev.set_aggregators(&self.aggregators);
        ev
    }
}

struct Fact {
    /// Ancestor-or-self closure of the fact's gender leaf.
    gender_cover: HashSet<MemberId>,
    /// Ancestor-or-self closure of the fact's state leaf.
    store_cover: HashSet<MemberId>,
    unit_sales: Option<f64>,
    store_sales: Option<f64>,
}

pub struct FactCells {
    facts: Vec<Fact>,
    unit_sales: MemberId,
    store_sales: MemberId,
    pending: RefCell<HashSet<MemberId>>,
    reads: Cell<u64>,
    last_predicates: RefCell<Option<TupleList>>,
}

impl FactCells {
    fn new(unit_sales: MemberId, store_sales: MemberId) -> Self {
        Self {
            facts: Vec::new(),
            unit_sales,
            store_sales,
            pending: RefCell::new(HashSet::new()),
            reads: Cell::new(0),
            last_predicates: RefCell::new(None),
        }
    }

    fn add_fact(
        &mut self,
        schema: &Schema,
        gender: MemberId,
        state: MemberId,
        unit_sales: Option<f64>,
        store_sales: Option<f64>,
    ) {
        let cover = |leaf: MemberId| {
            let mut set: HashSet<MemberId> = schema.ancestors_of(leaf).into_iter().collect();
            set.insert(leaf);
            set
        };
        self.facts.push(Fact {
            gender_cover: cover(gender),
            store_cover: cover(state),
            unit_sales,
            store_sales,
        });
    }

    /// Any coordinate mentioning this member answers pending until cleared.
    pub fn mark_pending(&self, member: MemberId) {
        self.pending.borrow_mut().insert(member);
    }

    pub fn clear_pending(&self) {
        self.pending.borrow_mut().clear();
    }

    pub fn reads(&self) -> u64 {
        self.reads.get()
    }

    /// The predicate list handed to the last deferred aggregation.
    pub fn last_predicates(&self) -> Option<TupleList> {
        self.last_predicates.borrow().clone()
    }
}

impl CellReader for FactCells {
    fn cell_value(&self, coordinate: &[MemberId]) -> CellValue {
        self.reads.set(self.reads.get() + 1);
        if coordinate
            .iter()
            .any(|m| self.pending.borrow().contains(m))
        {
            return CellValue::Pending;
        }
        let &[gender, store, measure] = coordinate else {
            return CellValue::Ready(Datum::Null);
        };
        let mut total: Option<f64> = None;
        for fact in &self.facts {
            if !fact.gender_cover.contains(&gender) || !fact.store_cover.contains(&store) {
                continue;
            }
            let value = if measure == self.unit_sales {
                fact.unit_sales
            } else if measure == self.store_sales {
                fact.store_sales
            } else {
                None
            };
            if let Some(v) = value {
                total = Some(total.unwrap_or(0.0) + v);
            }
        }
        CellValue::Ready(total.map(Datum::Number).unwrap_or(Datum::Null))
    }

    fn aggregated_value(&self, _coordinate: &[MemberId], predicates: &TupleList) -> CellValue {
        *self.last_predicates.borrow_mut() = Some(predicates.clone());
        // A stub storage layer: the tests only observe the reduced list.
        CellValue::Ready(Datum::Number(predicates.len() as f64))
    }
}
