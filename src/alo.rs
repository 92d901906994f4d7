//! Attribute-Level-Object collection. Builds the `proteomes_by_level_by_attribute` partition and
//! the two synthetic attributes `all` and `TAXON`, plus taxrank
//! attributes synthesised from a taxid nodes-database lineage walk.

use compact_str::CompactString;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::error::{EngineError, Result};
use crate::model::{Attribute, AttributeId, Level, LevelId, Proteome, ProteomeId, ATTRIBUTE_ALL, ATTRIBUTE_TAXON};
use crate::parsers::config_file::ConfigTable;
use crate::parsers::nodes_db::NodesDb;

#[derive(Debug, Clone)]
pub struct AloCollection {
    pub proteomes: Vec<Proteome>,
    pub proteome_by_name: FxHashMap<CompactString, ProteomeId>,
    pub attributes: Vec<Attribute>,
    pub levels: Vec<Level>,
    pub attribute_by_name: FxHashMap<CompactString, AttributeId>,
}

impl AloCollection {
    pub fn attribute(&self, id: AttributeId) -> &Attribute {
        &self.attributes[id.index()]
    }

    pub fn level(&self, id: LevelId) -> &Level {
        &self.levels[id.index()]
    }

    pub fn proteome(&self, id: ProteomeId) -> &Proteome {
        &self.proteomes[id.index()]
    }

    pub fn outgroup_proteomes(&self) -> Vec<ProteomeId> {
        self.proteomes.iter().filter(|p| p.is_outgroup).map(|p| p.id).collect()
    }

    /// Attribute names in a stable, deterministic order: user-defined
    /// attributes first (config column order), then synthesised
    /// taxrank attributes, then `all`, then `TAXON` last.
    pub fn attribute_names(&self) -> Vec<CompactString> {
        self.attributes.iter().map(|a| a.name.clone()).collect()
    }
}

pub fn build_alo_collection(
    config: &ConfigTable,
    nodes_db: Option<&NodesDb>,
    taxranks: &[String],
) -> Result<AloCollection> {
    let needs_lineage = config.records.iter().any(|r| r.taxid.is_some());
    if needs_lineage && nodes_db.is_none() {
        return Err(EngineError::config(
            "config declares TAXID values but no nodes database was supplied",
        ));
    }

    let mut proteomes = Vec::with_capacity(config.records.len());
    let mut proteome_by_name = FxHashMap::default();
    for (i, record) in config.records.iter().enumerate() {
        let id = ProteomeId(i as u32);
        proteome_by_name.insert(record.taxon.clone(), id);
        proteomes.push(Proteome {
            id,
            name: record.taxon.clone(),
            idx: record.idx,
            taxid: record.taxid,
            is_outgroup: record.is_outgroup,
            level_by_attribute: FxHashMap::default(),
        });
    }

    let mut attributes = Vec::new();
    let mut levels = Vec::new();
    let mut attribute_by_name = FxHashMap::default();

    // User-defined attributes, in config column order.
    for name in &config.attribute_names {
        let values: Vec<CompactString> = config
            .records
            .iter()
            .map(|r| r.attributes.get(name).cloned().unwrap_or_default())
            .collect();
        add_attribute(
            &mut attributes,
            &mut levels,
            &mut attribute_by_name,
            &mut proteomes,
            name.clone(),
            &values,
        );
    }

    // Synthetic taxrank attributes via nodes-db lineage lookup.
    if needs_lineage {
        let db = nodes_db.unwrap();
        for rank in taxranks {
            let values: Vec<CompactString> = config
                .records
                .iter()
                .map(|r| match r.taxid {
                    Some(taxid) => {
                        let lineage = db.lineage(taxid, std::slice::from_ref(rank));
                        CompactString::from(
                            lineage.get(rank).cloned().unwrap_or_else(|| "not_available".to_string()),
                        )
                    }
                    None => CompactString::from("not_available"),
                })
                .collect();
            add_attribute(
                &mut attributes,
                &mut levels,
                &mut attribute_by_name,
                &mut proteomes,
                CompactString::from(rank.as_str()),
                &values,
            );
        }
    }

    // Synthetic `all`: single level containing every proteome.
    {
        let values: Vec<CompactString> = config.records.iter().map(|_| CompactString::from(ATTRIBUTE_ALL)).collect();
        add_attribute(
            &mut attributes,
            &mut levels,
            &mut attribute_by_name,
            &mut proteomes,
            CompactString::from(ATTRIBUTE_ALL),
            &values,
        );
    }

    // Synthetic `TAXON`: one level per proteome.
    {
        let values: Vec<CompactString> = config.records.iter().map(|r| r.taxon.clone()).collect();
        add_attribute(
            &mut attributes,
            &mut levels,
            &mut attribute_by_name,
            &mut proteomes,
            CompactString::from(ATTRIBUTE_TAXON),
            &values,
        );
    }

    log::info!(
        "[STATUS]\t- built ALO collection: {} proteomes, {} attributes",
        proteomes.len(),
        attributes.len()
    );

    Ok(AloCollection {
        proteomes,
        proteome_by_name,
        attributes,
        levels,
        attribute_by_name,
    })
}

fn add_attribute(
    attributes: &mut Vec<Attribute>,
    levels: &mut Vec<Level>,
    attribute_by_name: &mut FxHashMap<CompactString, AttributeId>,
    proteomes: &mut [Proteome],
    name: CompactString,
    values: &[CompactString],
) {
    let attribute_id = AttributeId(attributes.len() as u32);
    let mut level_by_name: FxHashMap<CompactString, LevelId> = FxHashMap::default();
    let mut level_ids: Vec<LevelId> = Vec::new();

    for (i, value) in values.iter().enumerate() {
        let proteome_id = proteomes[i].id;
        let level_id = *level_by_name.entry(value.clone()).or_insert_with(|| {
            let id = LevelId(levels.len() as u32);
            levels.push(Level {
                id,
                attribute_id,
                name: value.clone(),
                proteomes: Vec::new(),
                proteome_set: FxHashSet::default(),
            });
            level_ids.push(id);
            id
        });
        levels[level_id.index()].proteomes.push(proteome_id);
        levels[level_id.index()].proteome_set.insert(proteome_id);
        proteomes[i].level_by_attribute.insert(attribute_id, level_id);
    }

    for level_id in &level_ids {
        levels[level_id.index()].proteomes.sort();
    }

    attributes.push(Attribute {
        id: attribute_id,
        name: name.clone(),
        levels: level_ids,
        level_by_name,
    });
    attribute_by_name.insert(name, attribute_id);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parsers::config_file::ConfigRecord;

    fn table(records: Vec<ConfigRecord>, attrs: Vec<&str>) -> ConfigTable {
        ConfigTable {
            records,
            attribute_names: attrs.into_iter().map(CompactString::from).collect(),
        }
    }

    #[test]
    fn partitions_proteomes_by_level() {
        let mut attrs_a = FxHashMap::default();
        attrs_a.insert(CompactString::from("g"), CompactString::from("x"));
        let mut attrs_b = FxHashMap::default();
        attrs_b.insert(CompactString::from("g"), CompactString::from("x"));

        let records = vec![
            ConfigRecord { idx: 0, taxon: "A".into(), taxid: None, is_outgroup: false, attributes: attrs_a },
            ConfigRecord { idx: 1, taxon: "B".into(), taxid: None, is_outgroup: false, attributes: attrs_b },
        ];
        let cfg = table(records, vec!["g"]);
        let alo = build_alo_collection(&cfg, None, &[]).unwrap();

        let g_id = alo.attribute_by_name["g"];
        let g = alo.attribute(g_id);
        assert_eq!(g.levels.len(), 1);

        let all_id = alo.attribute_by_name[ATTRIBUTE_ALL];
        assert_eq!(alo.attribute(all_id).levels.len(), 1);

        let taxon_id = alo.attribute_by_name[ATTRIBUTE_TAXON];
        assert_eq!(alo.attribute(taxon_id).levels.len(), 2);
    }

    #[test]
    fn missing_nodes_db_with_taxid_is_config_error() {
        let mut attrs = FxHashMap::default();
        attrs.insert(CompactString::from("g"), CompactString::from("x"));
        let records = vec![ConfigRecord {
            idx: 0,
            taxon: "A".into(),
            taxid: Some(9606),
            is_outgroup: false,
            attributes: attrs,
        }];
        let cfg = table(records, vec!["g"]);
        assert!(build_alo_collection(&cfg, None, &["phylum".to_string()]).is_err());
    }
}
